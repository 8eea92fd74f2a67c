//! Core trait definition for the blob storage layer

use async_trait::async_trait;

use super::config::StorageConfig;
use super::error::{StorageError, StorageResult};
use super::types::ByteRange;

/// Key/value blob storage shared between the orchestrator and remote units
///
/// Implementations must be safe for concurrent use: every fan-out task uploads
/// through the same instance.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous blob
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Fetch the blob stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether a blob exists under `key`
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Configuration describing where this store lives
    fn config(&self) -> &StorageConfig;

    /// Fetch a byte range of the blob stored under `key`
    async fn get_range(&self, key: &str, range: ByteRange) -> StorageResult<Vec<u8>> {
        let blob = self.get(key).await?;
        range
            .slice(&blob)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| StorageError::RangeOutOfBounds {
                key: key.to_string(),
                start: range.start(),
                end: range.end(),
                len: blob.len(),
            })
    }

    /// Key prefix under which callsets are written
    fn prefix(&self) -> &str {
        &self.config().prefix
    }
}
