//! Callable package production
//!
//! The orchestrator never inspects serialized bytes. It asks a [`Serializer`]
//! for the function blob, one payload per input and the module files the
//! function depends on, then ships them through the blob store.

pub mod callable;
pub mod json;
pub mod modules;

pub use callable::{Callable, RemoteFunction};
pub use json::JsonSerializer;
pub use modules::{create_module_data, exclude_modules, FunctionPackage};

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read module {path}: {source}")]
    ModuleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Output of serializing a function together with its inputs
#[derive(Debug, Clone, Default)]
pub struct SerializedJob {
    pub func: Vec<u8>,
    pub data: Vec<Vec<u8>>,
    pub module_paths: Vec<PathBuf>,
}

impl SerializedJob {
    /// Total size of the per-input payloads
    pub fn data_size_bytes(&self) -> usize {
        self.data.iter().map(Vec::len).sum()
    }
}

/// Produces opaque payloads for a callable and its inputs
pub trait Serializer: Send + Sync {
    /// Serialize `func` and every input in one pass
    ///
    /// When `capture_modules` is false the module graph is not resolved and
    /// `module_paths` comes back empty.
    fn serialize(
        &self,
        func: &RemoteFunction,
        data: &[Value],
        capture_modules: bool,
    ) -> Result<SerializedJob, SerializeError>;
}
