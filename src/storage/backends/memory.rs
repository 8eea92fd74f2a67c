//! In-memory blob store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{
    config::{BackendType, StorageConfig},
    error::{StorageError, StorageResult},
    traits::BlobStore,
};

/// In-memory blob store
///
/// Cloning shares the underlying map, which is how the local invoker and the
/// orchestrator see the same blobs.
#[derive(Clone)]
pub struct MemoryBlobStore {
    config: StorageConfig,
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    puts: Arc<AtomicUsize>,
}

impl MemoryBlobStore {
    /// Create a new memory store
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        if config.backend != BackendType::Memory {
            return Err(StorageError::configuration(
                "Invalid backend config for memory storage",
            ));
        }

        Ok(Self {
            config: config.clone(),
            blobs: Arc::new(RwLock::new(HashMap::new())),
            puts: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create a memory store with the given key prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: StorageConfig::memory(prefix),
            blobs: Arc::new(RwLock::new(HashMap::new())),
            puts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `put` calls served so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// All keys currently stored, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::invalid_key("empty key"));
        }
        self.blobs.write().await.insert(key.to_string(), data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.blobs.read().await.contains_key(key))
    }

    fn config(&self) -> &StorageConfig {
        &self.config
    }
}
