//! File-based blob store

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::trace;

use crate::storage::{
    config::{BackendType, StorageConfig},
    error::{StorageError, StorageResult},
    traits::BlobStore,
};

/// Blob store that keeps each blob in its own file under `base_dir/bucket`
pub struct FileBlobStore {
    config: StorageConfig,
    root: PathBuf,
}

impl FileBlobStore {
    /// Create a new file store, creating the root directory if needed
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        if config.backend != BackendType::File {
            return Err(StorageError::configuration(
                "Invalid backend config for file storage",
            ));
        }
        let base_dir = config
            .base_dir
            .clone()
            .ok_or_else(|| StorageError::configuration("File storage requires base_dir"))?;

        let root = base_dir.join(&config.bucket);
        fs::create_dir_all(&root).await?;

        Ok(Self {
            config: config.clone(),
            root,
        })
    }

    /// Map a key to a path below the root, rejecting escapes
    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::invalid_key(key));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never observe a partial blob.
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &path).await?;
        trace!("Wrote blob {} to {}", key, path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn config(&self) -> &StorageConfig {
        &self.config
    }
}
