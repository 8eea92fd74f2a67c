//! Per-call bookkeeping kept on the host side

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::args::InvocationArguments;

/// Timing and diagnostic data attached to every result handle
///
/// Nothing in here affects correctness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostJobMetadata {
    pub agg_data: bool,
    pub data_size_bytes: usize,
    pub func_module_bytes: usize,
    pub func_upload_secs: Option<f64>,
    pub func_upload_timestamp: Option<DateTime<Utc>>,
    pub data_upload_secs: Option<f64>,
    pub data_upload_timestamp: Option<DateTime<Utc>>,
    pub job_invoke_timestamp: Option<DateTime<Utc>>,
    pub invoke_timestamp: Option<DateTime<Utc>>,
    pub invoke_secs: Option<f64>,
    /// Configuration reported by the invocation backend
    #[serde(default)]
    pub backend_config: BTreeMap<String, Value>,
    /// The record actually sent to the backend
    #[serde(default)]
    pub invoke_args: Option<InvocationArguments>,
}

impl HostJobMetadata {
    pub fn record_func_upload(&mut self, elapsed: Duration) {
        self.func_upload_secs = Some(elapsed.as_secs_f64());
        self.func_upload_timestamp = Some(Utc::now());
    }

    pub fn record_data_upload(&mut self, elapsed: Duration) {
        self.data_upload_secs = Some(elapsed.as_secs_f64());
        self.data_upload_timestamp = Some(Utc::now());
    }

    pub fn record_invoke(&mut self, started: DateTime<Utc>, elapsed: Duration) {
        self.invoke_timestamp = Some(started);
        self.invoke_secs = Some(elapsed.as_secs_f64());
    }

    pub fn merge_backend_config(&mut self, config: BTreeMap<String, Value>) {
        self.backend_config.extend(config);
    }
}
