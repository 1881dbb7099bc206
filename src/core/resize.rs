use log::{debug, warn};

use super::backend::{RenderBackend, SurfaceId};
use super::error::Result;
use super::viewport::Viewport;
use crate::camera::PerspectiveCamera;

/// Keeps camera projection and surface size in step with the mount point
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizePolicy {
    current: Option<Viewport>,
}

impl ResizePolicy {
    pub fn new(initial: Viewport) -> Self {
        Self { current: Some(initial) }
    }

    /// Last size that was applied successfully
    pub fn current(&self) -> Option<Viewport> {
        self.current
    }

    /// Apply a new mount size.
    ///
    /// A zero dimension or a failed surface resize leaves both the camera
    /// and the surface at the previous valid size.
    pub fn on_resize(
        &mut self,
        size: (u32, u32),
        camera: &mut PerspectiveCamera,
        backend: &mut dyn RenderBackend,
        surface: SurfaceId,
    ) -> Result<Viewport> {
        let viewport = match Viewport::try_from(size) {
            Ok(viewport) => viewport,
            Err(e) => {
                warn!("Ignoring resize to {}x{}: {}", size.0, size.1, e);
                return Err(e);
            }
        };

        if self.current == Some(viewport) {
            return Ok(viewport);
        }

        let previous_aspect = camera.aspect;
        camera.aspect = viewport.aspect();
        if let Err(e) = backend.resize_surface(surface, viewport) {
            camera.aspect = previous_aspect;
            warn!("Surface resize to {}x{} failed: {}", viewport.width, viewport.height, e);
            return Err(e);
        }

        debug!("Resized to {}x{}", viewport.width, viewport.height);
        self.current = Some(viewport);
        Ok(viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SceneError, GeometryId, MaterialDesc, MaterialId, RenderFrame, ResourceId, SurfaceOptions, TextureData, TextureId};
    use crate::scene::GeometryData;

    #[derive(Default)]
    struct SizeRecorder {
        sizes: Vec<Viewport>,
        fail: bool,
    }

    impl RenderBackend for SizeRecorder {
        fn create_surface(&mut self, _: Viewport, _: &SurfaceOptions) -> Result<SurfaceId> {
            Ok(SurfaceId(1))
        }

        fn resize_surface(&mut self, _: SurfaceId, viewport: Viewport) -> Result<()> {
            if self.fail {
                return Err(SceneError::Surface("device lost".to_string()));
            }
            self.sizes.push(viewport);
            Ok(())
        }

        fn create_geometry(&mut self, _: &GeometryData) -> Result<GeometryId> {
            Ok(GeometryId(1))
        }

        fn create_material(&mut self, _: &MaterialDesc) -> Result<MaterialId> {
            Ok(MaterialId(1))
        }

        fn create_texture(&mut self, _: &TextureData) -> Result<TextureId> {
            Ok(TextureId(1))
        }

        fn set_material_color(&mut self, _: MaterialId, _: [f32; 4]) -> Result<()> {
            Ok(())
        }

        fn render(&mut self, _: SurfaceId, _: &RenderFrame<'_>) -> Result<()> {
            Ok(())
        }

        fn dispose(&mut self, _: ResourceId) -> Result<()> {
            Ok(())
        }
    }

    fn setup() -> (ResizePolicy, PerspectiveCamera, SizeRecorder) {
        let viewport = Viewport::new(800, 600).unwrap();
        (
            ResizePolicy::new(viewport),
            PerspectiveCamera::new(75.0, viewport.aspect(), 0.1, 1000.0),
            SizeRecorder::default(),
        )
    }

    #[test]
    fn test_resize_updates_aspect_and_surface() {
        let (mut policy, mut camera, mut backend) = setup();
        let applied = policy.on_resize((1024, 512), &mut camera, &mut backend, SurfaceId(1)).unwrap();

        assert_eq!(applied, Viewport::new(1024, 512).unwrap());
        assert_eq!(camera.aspect, 2.0);
        assert_eq!(backend.sizes, vec![applied]);
        assert_eq!(policy.current(), Some(applied));
    }

    #[test]
    fn test_zero_height_rejected() {
        let (mut policy, mut camera, mut backend) = setup();
        let err = policy.on_resize((800, 0), &mut camera, &mut backend, SurfaceId(1)).unwrap_err();

        assert!(err.is_empty_viewport());
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert!(backend.sizes.is_empty());
    }

    #[test]
    fn test_failed_surface_resize_restores_aspect() {
        let (mut policy, mut camera, mut backend) = setup();
        backend.fail = true;
        assert!(policy.on_resize((100, 100), &mut camera, &mut backend, SurfaceId(1)).is_err());
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(policy.current(), Viewport::new(800, 600).ok());
    }

    #[test]
    fn test_same_size_is_not_reapplied() {
        let (mut policy, mut camera, mut backend) = setup();
        policy.on_resize((800, 600), &mut camera, &mut backend, SurfaceId(1)).unwrap();
        assert!(backend.sizes.is_empty());
    }
}
