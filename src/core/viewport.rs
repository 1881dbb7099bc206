use super::error::{Result, SceneError};

/// Viewport - pixel dimensions of the mount point, both non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a viewport, rejecting a zero dimension
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SceneError::EmptyViewport { width, height });
        }
        Ok(Self { width, height })
    }

    /// Width over height
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Convert a pixel position to normalized device coordinates (-1..1, y up)
    pub fn to_ndc(&self, x: f32, y: f32) -> glam::Vec2 {
        glam::Vec2::new(
            (x / self.width as f32) * 2.0 - 1.0,
            1.0 - (y / self.height as f32) * 2.0,
        )
    }
}

impl TryFrom<(u32, u32)> for Viewport {
    type Error = SceneError;

    fn try_from((width, height): (u32, u32)) -> Result<Self> {
        Viewport::new(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_viewport_with_dimensions() {
        let vp = Viewport::new(1920, 1080).unwrap();
        assert_eq!(vp.width, 1920);
        assert_eq!(vp.height, 1080);
    }

    #[test]
    fn test_zero_width_rejected() {
        assert_eq!(
            Viewport::new(0, 600),
            Err(SceneError::EmptyViewport { width: 0, height: 600 })
        );
    }

    #[test]
    fn test_zero_height_rejected() {
        assert!(matches!(
            Viewport::new(800, 0),
            Err(SceneError::EmptyViewport { width: 800, height: 0 })
        ));
    }

    #[test]
    fn test_aspect() {
        let vp = Viewport::new(800, 600).unwrap();
        assert!((vp.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_ndc_corners() {
        let vp = Viewport::new(100, 50).unwrap();
        assert_eq!(vp.to_ndc(0.0, 0.0), glam::Vec2::new(-1.0, 1.0));
        assert_eq!(vp.to_ndc(100.0, 50.0), glam::Vec2::new(1.0, -1.0));
        assert_eq!(vp.to_ndc(50.0, 25.0), glam::Vec2::ZERO);
    }

    #[test]
    fn test_try_from_tuple() {
        let vp: Viewport = (1024, 768).try_into().unwrap();
        assert_eq!(vp, Viewport::new(1024, 768).unwrap());
        assert!(Viewport::try_from((0, 0)).is_err());
    }
}
