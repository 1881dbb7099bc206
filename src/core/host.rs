//! Host capabilities the scene core depends on.
//!
//! A host is whatever owns the mount point: a winit window in the viewer
//! binary, a fake in tests. The core never resizes its own container; it
//! only reads the size, attaches one surface node, schedules frames and
//! listens for resize notifications.

use super::backend::SurfaceId;
use super::error::Result;

/// Handle of a surface attached as a child of the mount point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceNode(pub u64);

/// Handle of one pending per-frame callback request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequest(pub u64);

/// Handle of a registered resize listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Cursor appearance requested by interactive objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Auto,
    Pointer,
}

/// Container the rendering surface is attached to
pub trait MountPoint {
    /// Current content size in physical pixels, may contain zeros
    fn client_size(&self) -> (u32, u32);

    /// Attach a surface as a child node
    fn append_surface(&mut self, surface: SurfaceId) -> Result<SurfaceNode>;

    /// Detach a previously attached surface node
    fn remove_surface(&mut self, node: SurfaceNode) -> Result<()>;
}

/// Per-display-refresh callback primitive
pub trait FrameScheduler {
    /// Ask for one callback on the next display refresh
    fn request_frame(&mut self) -> FrameRequest;

    /// Drop a pending request; cancelling an already-fired request is a no-op
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Global resize notification registry
pub trait ResizeEvents {
    fn add_resize_listener(&mut self) -> ListenerId;

    fn remove_resize_listener(&mut self, listener: ListenerId) -> Result<()>;
}

/// Everything a mounted scene needs from its host
pub trait Host: MountPoint + FrameScheduler + ResizeEvents {}

impl<T: MountPoint + FrameScheduler + ResizeEvents> Host for T {}
