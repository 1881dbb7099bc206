//! wgpu + egui implementation of the render backend

pub mod backend;
pub mod context;
pub mod ui;

pub use backend::WgpuBackend;
pub use context::GpuContext;
pub use ui::{ScreenLabel, UiLayer, SIDEBAR_BUTTONS};
