//! Error types for the blob storage layer

use std::fmt;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Blob not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Requested byte range lies outside the blob
    #[error("Byte range {start}..{end} out of bounds for {key} ({len} bytes)")]
    RangeOutOfBounds {
        key: String,
        start: u64,
        end: u64,
        len: usize,
    },

    /// Key rejected by the backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error wrapper
    #[error("Storage error: {0}")]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// Create a serialization error
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a not found error
    pub fn not_found<E: fmt::Display>(key: E) -> Self {
        Self::NotFound(key.to_string())
    }

    /// Create an invalid key error
    pub fn invalid_key<E: fmt::Display>(key: E) -> Self {
        Self::InvalidKey(key.to_string())
    }

    /// Create a configuration error
    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}
