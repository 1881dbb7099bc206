pub mod async_load;
pub mod gltf;

pub use async_load::{AssetLoader, LoadProgress, LoadReporter, LoadResult, PendingModel, ThreadedLoader};
pub use gltf::{parse_model, ModelData, ModelMaterial, ModelNode, ModelPrimitive};
