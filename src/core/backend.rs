use glam::Vec3;

use super::error::Result;
use super::viewport::Viewport;
use crate::camera::PerspectiveCamera;
use crate::scene::{GeometryData, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Any GPU-backed allocation a scene owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Geometry(GeometryId),
    Material(MaterialId),
    Texture(TextureId),
    Surface(SurfaceId),
}

impl ResourceId {
    pub fn label(&self) -> String {
        match self {
            ResourceId::Geometry(id) => format!("geometry #{}", id.0),
            ResourceId::Material(id) => format!("material #{}", id.0),
            ResourceId::Texture(id) => format!("texture #{}", id.0),
            ResourceId::Surface(id) => format!("surface #{}", id.0),
        }
    }
}

/// Standard lit material description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDesc {
    /// sRGB-encoded base colour, linear alpha
    pub base_color: [f32; 4],
    /// Optional base colour texture
    pub texture: Option<TextureId>,
}

impl MaterialDesc {
    pub fn color(rgb: [f32; 3]) -> Self {
        Self {
            base_color: [rgb[0], rgb[1], rgb[2], 1.0],
            texture: None,
        }
    }
}

/// RGBA8 texture pixels
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Options applied when the rendering surface is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptions {
    pub antialias: bool,
    pub shadows: bool,
    pub clear_color: [f32; 3],
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            antialias: false,
            shadows: false,
            clear_color: [0.0, 0.0, 0.0],
        }
    }
}

/// Screen-space label anchored to a world position
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub text: String,
    pub world_position: Vec3,
}

/// Everything drawn in one frame
pub struct RenderFrame<'a> {
    pub camera: &'a PerspectiveCamera,
    pub graph: &'a SceneGraph,
    pub overlays: &'a [Overlay],
}

/// Renderer seam - owns every GPU allocation behind opaque ids
pub trait RenderBackend {
    /// Create the drawable output target
    fn create_surface(&mut self, viewport: Viewport, options: &SurfaceOptions) -> Result<SurfaceId>;

    /// Replace the surface output buffer size
    fn resize_surface(&mut self, surface: SurfaceId, viewport: Viewport) -> Result<()>;

    fn create_geometry(&mut self, data: &GeometryData) -> Result<GeometryId>;

    fn create_material(&mut self, desc: &MaterialDesc) -> Result<MaterialId>;

    fn create_texture(&mut self, data: &TextureData) -> Result<TextureId>;

    fn set_material_color(&mut self, material: MaterialId, color: [f32; 4]) -> Result<()>;

    /// Draw camera + graph (+ overlays) into the surface
    fn render(&mut self, surface: SurfaceId, frame: &RenderFrame<'_>) -> Result<()>;

    /// Release one allocation
    fn dispose(&mut self, resource: ResourceId) -> Result<()>;
}
