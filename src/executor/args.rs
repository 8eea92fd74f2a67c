//! The record handed to the invocation backend for one call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{FanoutError, Result};
use crate::runtime::RuntimeConfig;
use crate::storage::{ByteRange, StorageConfig};

/// Version tag stamped on every invocation
pub const FANOUT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Field names owned by [`InvocationArguments`]; caller metadata may not use them
pub const RESERVED_FIELDS: &[&str] = &[
    "storage_config",
    "func_key",
    "data_key",
    "output_key",
    "status_key",
    "cancel_key",
    "callset_id",
    "call_id",
    "job_max_runtime",
    "data_byte_range",
    "use_cached_runtime",
    "runtime",
    "fanout_version",
    "runtime_url",
    "host_submit_time",
    "extra_env",
];

/// Everything a remote unit needs to run one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationArguments {
    pub storage_config: StorageConfig,
    pub func_key: String,
    pub data_key: String,
    pub output_key: String,
    pub status_key: String,
    pub cancel_key: String,
    pub callset_id: String,
    pub call_id: String,
    /// Execution deadline in seconds
    pub job_max_runtime: u64,
    /// Range into `data_key` when the callset's data is aggregated, inclusive on the wire
    pub data_byte_range: Option<ByteRange>,
    pub use_cached_runtime: bool,
    pub runtime: RuntimeConfig,
    pub fanout_version: String,
    /// Shard endpoint chosen for this call
    pub runtime_url: Option<String>,
    pub host_submit_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_env: Option<BTreeMap<String, String>>,
    /// Caller metadata, flattened next to the reserved fields
    #[serde(flatten)]
    pub extra_meta: BTreeMap<String, Value>,
}

/// Reject caller metadata that would shadow a reserved field
pub fn validate_extra_meta(meta: &BTreeMap<String, Value>) -> Result<()> {
    match meta.keys().find(|key| RESERVED_FIELDS.contains(&key.as_str())) {
        Some(key) => Err(FanoutError::MetadataKeyCollision { key: key.clone() }),
        None => Ok(()),
    }
}

impl InvocationArguments {
    /// Merge caller metadata, failing on any key already present
    pub fn merge_extra_meta(&mut self, meta: &BTreeMap<String, Value>) -> Result<()> {
        validate_extra_meta(meta)?;
        for (key, value) in meta {
            if self.extra_meta.contains_key(key) {
                return Err(FanoutError::MetadataKeyCollision { key: key.clone() });
            }
            self.extra_meta.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    /// Replace arbitrary fields; overrides win over every computed value
    pub fn apply_overrides(self, overrides: &Map<String, Value>) -> Result<Self> {
        if overrides.is_empty() {
            return Ok(self);
        }

        let Value::Object(mut record) = serde_json::to_value(&self)? else {
            return Err(FanoutError::InvalidOverride {
                field: "*".to_string(),
                reason: "invocation record is not an object".to_string(),
            });
        };
        for (field, value) in overrides {
            record.insert(field.clone(), value.clone());
        }

        serde_json::from_value(Value::Object(record)).map_err(|e| FanoutError::InvalidOverride {
            field: overrides.keys().cloned().collect::<Vec<_>>().join(","),
            reason: e.to_string(),
        })
    }
}
