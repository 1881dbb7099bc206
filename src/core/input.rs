use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Primary-button pointer input, in physical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Moved(Vec2),
    Pressed(Vec2),
    Released(Vec2),
    /// Positive zooms out
    Wheel(f32),
    Left,
}

/// Pixels of trackpad scroll equivalent to one wheel line
const PIXELS_PER_LINE: f32 = 40.0;

/// Adapter that turns winit window events into pointer events
#[derive(Debug, Clone, Default)]
pub struct PointerAdapter {
    position: Option<Vec2>,
}

impl PointerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, event: &WindowEvent) -> Option<PointerEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.position = Some(position);
                Some(PointerEvent::Moved(position))
            }
            WindowEvent::CursorLeft { .. } => {
                self.position = None;
                Some(PointerEvent::Left)
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let position = self.position?;
                Some(match state {
                    ElementState::Pressed => PointerEvent::Pressed(position),
                    ElementState::Released => PointerEvent::Released(position),
                })
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                (lines != 0.0).then_some(PointerEvent::Wheel(-lines))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::{DeviceId, TouchPhase};

    fn device() -> DeviceId {
        // SAFETY: only compared, never passed back to the platform layer
        unsafe { DeviceId::dummy() }
    }

    fn moved(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: device(),
            position: PhysicalPosition::new(x, y),
        }
    }

    fn button(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: device(),
            state,
            button: MouseButton::Left,
        }
    }

    #[test]
    fn test_press_uses_last_position() {
        let mut adapter = PointerAdapter::new();
        assert_eq!(adapter.translate(&button(ElementState::Pressed)), None);

        assert_eq!(adapter.translate(&moved(10.0, 20.0)), Some(PointerEvent::Moved(Vec2::new(10.0, 20.0))));
        assert_eq!(
            adapter.translate(&button(ElementState::Pressed)),
            Some(PointerEvent::Pressed(Vec2::new(10.0, 20.0)))
        );
        assert_eq!(
            adapter.translate(&button(ElementState::Released)),
            Some(PointerEvent::Released(Vec2::new(10.0, 20.0)))
        );
    }

    #[test]
    fn test_right_button_ignored() {
        let mut adapter = PointerAdapter::new();
        adapter.translate(&moved(1.0, 1.0));
        let event = WindowEvent::MouseInput {
            device_id: device(),
            state: ElementState::Pressed,
            button: MouseButton::Right,
        };
        assert_eq!(adapter.translate(&event), None);
    }

    #[test]
    fn test_wheel_up_zooms_in() {
        let mut adapter = PointerAdapter::new();
        let event = WindowEvent::MouseWheel {
            device_id: device(),
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
            phase: TouchPhase::Moved,
        };
        assert_eq!(adapter.translate(&event), Some(PointerEvent::Wheel(-1.0)));
    }

    #[test]
    fn test_cursor_left_forgets_position() {
        let mut adapter = PointerAdapter::new();
        adapter.translate(&moved(5.0, 5.0));
        let event = WindowEvent::CursorLeft {
            device_id: device(),
        };
        assert_eq!(adapter.translate(&event), Some(PointerEvent::Left));
        let press = WindowEvent::MouseInput {
            device_id: device(),
            state: ElementState::Pressed,
            button: MouseButton::Left,
        };
        assert_eq!(adapter.translate(&press), None);
    }
}
