use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

use crate::camera::PerspectiveCamera;
use crate::config::ControlsConfig;
use crate::core::{Result, SceneError, Viewport};

const POLAR_EPSILON: f32 = 1e-6;
const MOVE_EPSILON: f32 = 1e-6;

/// Orbit navigation around a focal point with optional damping
///
/// Pointer drags accumulate a spherical delta; `update` applies a
/// fraction of it each frame when damping is enabled so motion decays
/// instead of stopping dead.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Pending (theta, phi) rotation
    spherical_delta: Vec2,
    scale: f32,
    last_pointer: Option<Vec2>,
    disposed: bool,
}

impl OrbitControls {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            spherical_delta: Vec2::ZERO,
            scale: 1.0,
            last_pointer: None,
            disposed: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.last_pointer.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn pointer_down(&mut self, position: Vec2) {
        if !self.disposed {
            self.last_pointer = Some(position);
        }
    }

    pub fn pointer_move(&mut self, position: Vec2, viewport: Viewport) {
        let Some(last) = self.last_pointer else {
            return;
        };
        let delta = position - last;
        let height = viewport.height as f32;
        self.rotate_left(TAU * delta.x / height * self.rotate_speed);
        self.rotate_up(TAU * delta.y / height * self.rotate_speed);
        self.last_pointer = Some(position);
    }

    pub fn pointer_up(&mut self) {
        self.last_pointer = None;
    }

    /// Abandon the current drag and any inertia it produced
    pub fn cancel_drag(&mut self) {
        self.last_pointer = None;
        self.spherical_delta = Vec2::ZERO;
    }

    /// Positive delta zooms out, negative zooms in
    pub fn wheel(&mut self, delta: f32) {
        if self.disposed || delta == 0.0 {
            return;
        }
        let zoom_scale = 0.95_f32.powf(self.zoom_speed);
        if delta < 0.0 {
            self.scale *= zoom_scale;
        } else {
            self.scale /= zoom_scale;
        }
    }

    fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.x -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.y -= angle;
    }

    /// Advance damping and move the camera; returns true if it moved
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if self.disposed {
            return false;
        }

        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return false;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let applied = if self.enable_damping {
            self.spherical_delta * self.damping_factor
        } else {
            self.spherical_delta
        };
        theta += applied.x;
        phi = (phi + applied.y).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        // Inverted limits must not panic
        let radius = (radius * self.scale).max(self.min_distance).min(self.max_distance);

        let new_position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );

        if self.enable_damping {
            self.spherical_delta *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = Vec2::ZERO;
        }
        self.scale = 1.0;

        let moved = (new_position - camera.position).length_squared() > MOVE_EPSILON;
        camera.position = new_position;
        camera.look_at(self.target);
        moved
    }

    /// Detach from input; further events and updates are ignored
    pub fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Err(SceneError::disposal("orbit controls", "already disposed"));
        }
        self.disposed = true;
        self.cancel_drag();
        Ok(())
    }
}
