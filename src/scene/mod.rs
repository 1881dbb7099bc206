pub mod assembly;
pub mod geometry;
pub mod graph;
pub mod interactive;

pub use assembly::{ModelSlot, SceneAssembly, SceneHandle, Spin};
pub use geometry::GeometryData;
pub use graph::{AmbientLight, DirectionalLight, MeshNode, Node, NodeId, NodeKind, SceneGraph, Transform};
pub use interactive::{InteractiveObject, InteractiveObjectState, Propagation};
