//! Orchestrator configuration
//!
//! Configuration is read from TOML:
//!
//! ```toml
//! [storage]
//! backend = "file"
//! base_dir = "/var/lib/fanout"
//! prefix = "jobs"
//!
//! [runtime]
//! bucket = "runtimes"
//! key = "default.tar.gz"
//!
//! [scheduler]
//! map_item_limit = 10000
//!
//! [invoke]
//! job_max_runtime = "5m"
//! pool_threads = 64
//! ```

pub mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::runtime::RuntimeConfig;
use crate::storage::StorageConfig;

/// Payloads smaller than this are uploaded as one aggregated blob
pub const MAX_AGG_DATA_SIZE: usize = 4_000_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FanoutConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub invoke: InvokeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Reject maps with more inputs than this
    #[serde(default)]
    pub map_item_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeConfig {
    /// Deadline handed to every remote unit
    #[serde(with = "humantime_serde", default = "default_job_max_runtime")]
    pub job_max_runtime: Duration,

    /// Default number of concurrent invocations per map
    #[serde(default = "default_pool_threads")]
    pub pool_threads: usize,

    /// Default for packing small inputs into one blob
    #[serde(default = "default_true")]
    pub data_all_as_one: bool,

    /// Aggregation threshold in bytes
    #[serde(default = "default_max_agg_data_size")]
    pub max_agg_data_size: usize,

    /// Interval between status polls while waiting on results
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,
}

fn default_job_max_runtime() -> Duration {
    Duration::from_secs(300)
}

fn default_pool_threads() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_max_agg_data_size() -> usize {
    MAX_AGG_DATA_SIZE
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            job_max_runtime: default_job_max_runtime(),
            pool_threads: default_pool_threads(),
            data_all_as_one: true,
            max_agg_data_size: default_max_agg_data_size(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl FanoutConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: FanoutConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FANOUT_*` environment overrides
    pub fn merge_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Ok(prefix) = std::env::var("FANOUT_STORAGE_PREFIX") {
            self.storage.prefix = prefix;
        }
        if let Ok(bucket) = std::env::var("FANOUT_STORAGE_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Ok(limit) = std::env::var("FANOUT_MAP_ITEM_LIMIT") {
            let limit = limit.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "FANOUT_MAP_ITEM_LIMIT".to_string(),
                reason: format!("{limit:?} is not a count: {e}"),
            })?;
            self.scheduler.map_item_limit = Some(limit);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invoke.pool_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "invoke.pool_threads".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.invoke.job_max_runtime.is_zero() {
            return Err(ConfigError::Invalid {
                field: "invoke.job_max_runtime".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
