//! Storage configuration types and utilities

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{StorageError, StorageResult};

/// Storage backend type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// In-process storage (default, shared with the local invoker)
    #[default]
    Memory,
    /// Directory-backed storage
    File,
}

/// Storage configuration
///
/// This record is also shipped to the remote unit inside every invocation so
/// that the worker can reach the same blobs the orchestrator wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendType,

    /// Bucket or namespace holding every blob
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Key prefix under which callsets are written
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Root directory for the file backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

fn default_bucket() -> String {
    "fanout".to_string()
}

fn default_prefix() -> String {
    "fanout.jobs".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            bucket: default_bucket(),
            prefix: default_prefix(),
            base_dir: None,
        }
    }
}

impl StorageConfig {
    /// Create a memory-backed configuration with the given prefix
    pub fn memory(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Create a file-backed configuration rooted at `base_dir`
    pub fn file(base_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            backend: BackendType::File,
            prefix: prefix.into(),
            base_dir: Some(base_dir.into()),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> StorageResult<Self> {
        let backend = match std::env::var("FANOUT_STORAGE_TYPE") {
            Ok(value) => match value.to_lowercase().as_str() {
                "file" => BackendType::File,
                "memory" => BackendType::Memory,
                other => {
                    return Err(StorageError::configuration(format!(
                        "Unknown storage type: {}",
                        other
                    )))
                }
            },
            Err(_) => BackendType::default(),
        };

        let base_dir = std::env::var("FANOUT_STORAGE_DIR").ok().map(PathBuf::from);
        if backend == BackendType::File && base_dir.is_none() {
            return Err(StorageError::configuration(
                "FANOUT_STORAGE_DIR is required for the file backend",
            ));
        }

        Ok(Self {
            backend,
            bucket: std::env::var("FANOUT_STORAGE_BUCKET").unwrap_or_else(|_| default_bucket()),
            prefix: std::env::var("FANOUT_STORAGE_PREFIX").unwrap_or_else(|_| default_prefix()),
            base_dir,
        })
    }

    /// Location handed to result handles: bucket followed by prefix
    pub fn storage_path(&self) -> (String, String) {
        (self.bucket.clone(), self.prefix.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_backend_type_default() {
        assert_eq!(BackendType::default(), BackendType::Memory);
    }

    #[test]
    fn test_backend_type_serialization() {
        let json = serde_json::to_string(&BackendType::File).unwrap();
        assert_eq!(json, r#""file""#);

        let backend: BackendType = serde_json::from_str(r#""memory""#).unwrap();
        assert_eq!(backend, BackendType::Memory);
    }

    #[test]
    fn test_storage_config_deserialize_fills_defaults() {
        let config: StorageConfig = serde_json::from_str(r#"{"prefix": "jobs"}"#).unwrap();

        assert_eq!(config.backend, BackendType::Memory);
        assert_eq!(config.bucket, "fanout");
        assert_eq!(config.prefix, "jobs");
        assert!(config.base_dir.is_none());
    }

    #[test]
    #[serial]
    fn test_storage_config_from_env_defaults() {
        env::remove_var("FANOUT_STORAGE_TYPE");
        env::remove_var("FANOUT_STORAGE_DIR");
        env::remove_var("FANOUT_STORAGE_PREFIX");
        env::remove_var("FANOUT_STORAGE_BUCKET");

        let config = StorageConfig::from_env().unwrap();
        assert_eq!(config, StorageConfig::default());
    }

    #[test]
    #[serial]
    fn test_storage_config_from_env_file_requires_dir() {
        env::set_var("FANOUT_STORAGE_TYPE", "file");
        env::remove_var("FANOUT_STORAGE_DIR");

        let err = StorageConfig::from_env().unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));

        env::set_var("FANOUT_STORAGE_DIR", "/tmp/fanout-test");
        env::set_var("FANOUT_STORAGE_PREFIX", "custom");
        let config = StorageConfig::from_env().unwrap();
        assert_eq!(config.backend, BackendType::File);
        assert_eq!(config.base_dir, Some(PathBuf::from("/tmp/fanout-test")));
        assert_eq!(config.prefix, "custom");

        env::remove_var("FANOUT_STORAGE_TYPE");
        env::remove_var("FANOUT_STORAGE_DIR");
        env::remove_var("FANOUT_STORAGE_PREFIX");
    }
}
