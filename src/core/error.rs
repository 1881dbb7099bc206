use std::path::PathBuf;
use thiserror::Error;

use super::backend::ResourceId;

/// Errors raised by the scene core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Mount or resize observed a zero dimension
    #[error("viewport has an empty dimension: {width}x{height}")]
    EmptyViewport { width: u32, height: u32 },

    /// The asynchronous model load rejected
    #[error("failed to load asset {}: {reason}", path.display())]
    AssetLoad { path: PathBuf, reason: String },

    /// A single release step failed during teardown
    #[error("failed to dispose {resource}: {reason}")]
    Disposal { resource: String, reason: String },

    #[error("surface error: {0}")]
    Surface(String),

    #[error("unknown resource: {0:?}")]
    UnknownResource(ResourceId),

    #[error("host error: {0}")]
    Host(String),
}

impl SceneError {
    pub fn disposal(resource: impl Into<String>, reason: impl ToString) -> Self {
        SceneError::Disposal {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Re-label a failure raised while releasing `resource`
    pub fn into_disposal(self, resource: impl Into<String>) -> Self {
        match self {
            SceneError::Disposal { .. } => self,
            other => SceneError::disposal(resource, other),
        }
    }

    pub fn is_empty_viewport(&self) -> bool {
        matches!(self, SceneError::EmptyViewport { .. })
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;
