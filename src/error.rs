//! Crate-level error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::invoker::InvokerError;
use crate::serialize::SerializeError;
use crate::storage::StorageError;

/// Result alias used throughout the orchestrator
pub type Result<T> = std::result::Result<T, FanoutError>;

#[derive(Error, Debug)]
pub enum FanoutError {
    #[error("len(data) = {items}, exceeding map item limit of {limit}; consider mapping over a smaller number of items")]
    MapItemLimitExceeded { items: usize, limit: usize },

    #[error("Metadata key {key} collides with a reserved invocation field")]
    MetadataKeyCollision { key: String },

    #[error("Cannot both load module dependencies from shared storage and sync them to it")]
    ConflictingPackageModes,

    #[error("Invalid invocation override for {field}: {reason}")]
    InvalidOverride { field: String, reason: String },

    #[error("Call {callset_id}/{call_id} failed: {message}")]
    CallFailed {
        callset_id: String,
        call_id: String,
        message: String,
    },

    #[error("Call {callset_id}/{call_id} was cancelled")]
    CallCancelled { callset_id: String, call_id: String },

    #[error("Reduce input {callset_id}/{call_id} did not succeed")]
    ReduceInputFailed { callset_id: String, call_id: String },

    #[error("Map returned no result handle")]
    NoHandle,

    #[error("Invocation task for call {call_id} did not complete: {source}")]
    TaskJoin {
        call_id: String,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] SerializeError),

    #[error("Invocation error: {0}")]
    Invoker(#[from] InvokerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FanoutError {
    /// Errors raised before any storage or backend activity
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MapItemLimitExceeded { .. }
                | Self::MetadataKeyCollision { .. }
                | Self::ConflictingPackageModes
                | Self::InvalidOverride { .. }
        )
    }
}
