//! Runtime metadata published by the invocation backend
//!
//! The runtime advertises which capabilities are already installed (so they
//! need not be shipped in the function package) and, optionally, a list of
//! interchangeable execution endpoints.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::{BlobStore, StorageResult};

/// Location of a runtime image, forwarded verbatim to the remote unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub key: String,
}

impl RuntimeConfig {
    /// Blob key holding the runtime's metadata document
    pub fn meta_key(&self) -> String {
        if self.key.is_empty() {
            return "runtime.meta.json".to_string();
        }
        match self.key.strip_suffix(".tar.gz") {
            Some(stem) => format!("{}.meta.json", stem),
            None => format!("{}.meta.json", self.key),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    /// Capability markers installed on the runtime
    #[serde(default)]
    pub preinstalls: Vec<String>,
    /// Interchangeable endpoints, one is picked per call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

impl RuntimeInfo {
    pub fn with_preinstalls<I, S>(mut self, preinstalls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preinstalls.extend(preinstalls.into_iter().map(Into::into));
        self
    }

    pub fn with_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls = Some(urls.into_iter().map(Into::into).collect());
        self
    }

    /// Shard endpoints, if the runtime is sharded
    pub fn shard_urls(&self) -> Option<&[String]> {
        self.urls.as_deref().filter(|urls| !urls.is_empty())
    }

    /// Load the metadata document for `runtime` from the store
    pub async fn load(store: &dyn BlobStore, runtime: &RuntimeConfig) -> StorageResult<Self> {
        let key = runtime.meta_key();
        let bytes = store.get(&key).await?;
        let info: RuntimeInfo = serde_json::from_slice(&bytes)?;
        info!(
            "Loaded runtime metadata {} ({} preinstalls, {} shards)",
            key,
            info.preinstalls.len(),
            info.shard_urls().map_or(0, <[String]>::len)
        );
        Ok(info)
    }
}
