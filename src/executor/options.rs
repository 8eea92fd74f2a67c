//! Per-map options

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::config::InvokeConfig;

/// Knobs accepted by [`Executor::map`](super::Executor::map)
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Extra environment variables for the remote unit
    pub extra_env: Option<BTreeMap<String, String>>,
    /// Caller metadata merged into the invocation record
    pub extra_meta: Option<BTreeMap<String, Value>>,
    /// Maximum concurrent invocations
    pub invoke_pool_threads: usize,
    /// Pack small inputs into one blob
    pub data_all_as_one: bool,
    pub use_cached_runtime: bool,
    /// Replace fields of the invocation record; meant for test injection
    pub overwrite_invoke_args: Option<Map<String, Value>>,
    /// Module path substrings to leave out of the function package
    pub exclude_modules: Vec<String>,
    /// Reuse a package prepared by `parse_module_dependencies`
    pub module_dependencies_key: Option<String>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            extra_env: None,
            extra_meta: None,
            invoke_pool_threads: 64,
            data_all_as_one: true,
            use_cached_runtime: true,
            overwrite_invoke_args: None,
            exclude_modules: Vec::new(),
            module_dependencies_key: None,
        }
    }
}

impl MapOptions {
    /// Options seeded from the configured invoke defaults
    pub fn from_config(config: &InvokeConfig) -> Self {
        Self {
            invoke_pool_threads: config.pool_threads,
            data_all_as_one: config.data_all_as_one,
            ..Self::default()
        }
    }

    pub fn with_pool_threads(mut self, threads: usize) -> Self {
        self.invoke_pool_threads = threads;
        self
    }

    pub fn with_data_all_as_one(mut self, enabled: bool) -> Self {
        self.data_all_as_one = enabled;
        self
    }

    pub fn with_extra_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_extra_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_meta
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_override(mut self, field: impl Into<String>, value: Value) -> Self {
        self.overwrite_invoke_args
            .get_or_insert_with(Map::new)
            .insert(field.into(), value);
        self
    }

    pub fn with_excluded_module(mut self, module: impl Into<String>) -> Self {
        self.exclude_modules.push(module.into());
        self
    }

    pub fn with_module_dependencies_key(mut self, key: impl Into<String>) -> Self {
        self.module_dependencies_key = Some(key.into());
        self
    }

    /// Pool size actually used; a zero-sized pool would never make progress
    pub(crate) fn pool_size(&self) -> usize {
        self.invoke_pool_threads.max(1)
    }
}
