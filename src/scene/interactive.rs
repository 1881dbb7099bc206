use glam::{Mat4, Vec2, Vec3};

use crate::config::InteractiveConfig;
use crate::core::{CursorHint, MaterialId};
use crate::math::{intersect_aabb, with_alpha, Ray, AABB};

use super::graph::NodeId;

/// Hover and toggle flags; mutated only by pointer handlers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractiveObjectState {
    pub hovered: bool,
    pub toggled: bool,
}

/// Whether an event should continue on to navigation controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Clickable box with a hover colour and an expandable label
pub struct InteractiveObject {
    pub node: NodeId,
    pub material: MaterialId,
    state: InteractiveObjectState,
    bounds: AABB,
    idle_color: [f32; 3],
    hover_color: [f32; 3],
    label: String,
    label_offset: Vec3,
    drag_threshold: f32,
    press: Option<Vec2>,
    cursor: Option<Box<dyn FnMut(CursorHint)>>,
}

impl std::fmt::Debug for InteractiveObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveObject")
            .field("node", &self.node)
            .field("state", &self.state)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl InteractiveObject {
    pub fn new(node: NodeId, material: MaterialId, config: &InteractiveConfig) -> Self {
        Self {
            node,
            material,
            state: InteractiveObjectState::default(),
            bounds: AABB::from_size(Vec3::from_array(config.size)),
            idle_color: config.idle_color,
            hover_color: config.hover_color,
            label: config.label.clone(),
            label_offset: Vec3::from_array(config.label_offset),
            drag_threshold: config.drag_threshold,
            press: None,
            cursor: None,
        }
    }

    /// Install the capability used to change the pointer cursor
    pub fn set_cursor_hint(&mut self, cursor: impl FnMut(CursorHint) + 'static) {
        self.cursor = Some(Box::new(cursor));
    }

    pub fn state(&self) -> InteractiveObjectState {
        self.state
    }

    pub fn is_expanded(&self) -> bool {
        self.state.toggled
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Material colour for the current hover state
    pub fn color(&self) -> [f32; 4] {
        let rgb = if self.state.hovered { self.hover_color } else { self.idle_color };
        with_alpha(rgb, 1.0)
    }

    /// Distance along `ray` to the box, given its world matrix
    pub fn hit(&self, ray: &Ray, world: Mat4) -> Option<f32> {
        let inverse = world.inverse();
        let local = Ray::new(
            inverse.transform_point3(ray.origin),
            inverse.transform_vector3(ray.direction),
        );
        let t_local = intersect_aabb(&local, &self.bounds)?;
        let hit_world = world.transform_point3(local.at(t_local));
        Some((hit_world - ray.origin).length())
    }

    /// Returns true if the hover state changed
    pub fn pointer_enter(&mut self) -> bool {
        if self.state.hovered {
            return false;
        }
        self.state.hovered = true;
        self.hint(CursorHint::Pointer);
        true
    }

    /// Returns true if the hover state changed
    pub fn pointer_leave(&mut self) -> bool {
        if !self.state.hovered {
            return false;
        }
        self.state.hovered = false;
        self.press = None;
        self.hint(CursorHint::Auto);
        true
    }

    /// Press on the object; remembered to tell clicks from drags
    pub fn pointer_down(&mut self, position: Vec2) {
        self.press = Some(position);
    }

    /// Release; toggles only if the press started here and barely moved
    pub fn pointer_up(&mut self, position: Vec2, over_object: bool) -> Propagation {
        let Some(press) = self.press.take() else {
            return Propagation::Continue;
        };
        if !over_object || press.distance(position) > self.drag_threshold {
            return Propagation::Continue;
        }
        self.click();
        Propagation::Stop
    }

    /// Flip the overlay between collapsed and expanded
    pub fn click(&mut self) {
        self.state.toggled = !self.state.toggled;
    }

    /// World-space anchor of the label while expanded
    pub fn overlay_anchor(&self, world: Mat4) -> Option<Vec3> {
        self.state
            .toggled
            .then(|| world.transform_point3(self.label_offset))
    }

    fn hint(&mut self, hint: CursorHint) {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor(hint);
        }
    }
}
