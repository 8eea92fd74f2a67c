//! Storage factory for creating blob store instances

use std::sync::Arc;

use super::backends::{FileBlobStore, MemoryBlobStore};
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::traits::BlobStore;

/// Factory for creating blob stores
pub struct StorageFactory;

impl StorageFactory {
    /// Create a store from environment configuration
    pub async fn from_env() -> StorageResult<Arc<dyn BlobStore>> {
        let config = StorageConfig::from_env()?;
        Self::from_config(&config).await
    }

    /// Create a store from explicit configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn BlobStore>> {
        match config.backend {
            BackendType::File => {
                let backend = FileBlobStore::new(config).await?;
                Ok(Arc::new(backend))
            }
            BackendType::Memory => {
                let backend = MemoryBlobStore::new(config)?;
                Ok(Arc::new(backend))
            }
        }
    }
}
