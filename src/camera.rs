use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::core::Viewport;
use crate::math::Ray;

/// Perspective camera looking at a target point
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Width over height
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the camera through a point in normalized device coordinates
    pub fn ray_through(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse * ndc.extend(0.0).extend(1.0);
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        Ray::new(near, far - near)
    }

    /// Project a world point to pixel coordinates, None when behind the camera
    pub fn project(&self, world: Vec3, viewport: Viewport) -> Option<Vec2> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.width as f32,
            (1.0 - ndc.y) * 0.5 * viewport.height as f32,
        ))
    }

    /// Bytes for the shader's camera uniform
    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection().to_cols_array_2d(),
            position: self.position.to_array(),
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _pad: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(75.0, 800.0 / 600.0, 0.1, 1000.0)
    }

    #[test]
    fn test_default_position_on_z_axis() {
        let cam = camera();
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(cam.forward(), Vec3::NEG_Z);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let cam = camera();
        let ray = cam.ray_through(Vec2::ZERO);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.origin.x).abs() < 1e-4 && (ray.origin.y).abs() < 1e-4);
    }

    #[test]
    fn test_project_target_lands_in_center() {
        let cam = camera();
        let vp = Viewport::new(800, 600).unwrap();
        let screen = cam.project(Vec3::ZERO, vp).unwrap();
        assert!((screen.x - 400.0).abs() < 1e-3);
        assert!((screen.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_project_behind_camera() {
        let cam = camera();
        let vp = Viewport::new(800, 600).unwrap();
        assert!(cam.project(Vec3::new(0.0, 0.0, 10.0), vp).is_none());
    }

    #[test]
    fn test_project_above_center_is_higher_on_screen() {
        let cam = camera();
        let vp = Viewport::new(800, 600).unwrap();
        let screen = cam.project(Vec3::new(0.0, 1.0, 0.0), vp).unwrap();
        assert!(screen.y < 300.0);
    }

    #[test]
    fn test_look_at_updates_forward() {
        let mut cam = camera().with_position(Vec3::new(-1000.0, 1500.0, 1500.0));
        cam.look_at(Vec3::ZERO);
        let expected = (-Vec3::new(-1000.0, 1500.0, 1500.0)).normalize();
        assert!((cam.forward() - expected).length() < 1e-5);
    }
}
