//! Blob storage layer
//!
//! The orchestrator and the remote units never talk to each other directly;
//! function packages, input data, outputs and statuses all travel through a
//! [`BlobStore`] addressed by the key scheme in [`keys`].

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod keys;
pub mod traits;
pub mod types;


pub use backends::{FileBlobStore, MemoryBlobStore};
pub use config::{BackendType, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use keys::CallKeys;
pub use traits::BlobStore;
pub use types::ByteRange;
