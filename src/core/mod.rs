pub mod animation;
pub mod backend;
pub mod error;
pub mod host;
pub mod input;
pub mod lifecycle;
pub mod resize;
pub mod viewport;

pub use animation::{AnimationLoop, CancelToken};
pub use backend::{
    GeometryId, MaterialDesc, MaterialId, Overlay, RenderBackend, RenderFrame, ResourceId, SurfaceId, SurfaceOptions,
    TextureData, TextureId,
};
pub use error::{Result, SceneError};
pub use host::{CursorHint, FrameRequest, FrameScheduler, Host, ListenerId, MountPoint, ResizeEvents, SurfaceNode};
pub use input::{PointerAdapter, PointerEvent};
pub use lifecycle::{LoadStatus, SceneMount, TeardownReport};
pub use resize::ResizePolicy;
pub use viewport::Viewport;
