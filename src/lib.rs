pub mod camera;
pub mod cli;
pub mod config;
pub mod controls;
pub mod core;
pub mod frame;
pub mod gpu;
pub mod loaders;
pub mod math;
pub mod scene;

pub use config::{SceneKind, ViewerConfig};
pub use core::{SceneError, SceneMount, TeardownReport};
