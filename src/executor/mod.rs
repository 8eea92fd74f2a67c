//! Map/reduce orchestration
//!
//! The [`Executor`] turns a function and a list of inputs into one callset:
//! a function package, per-call data (optionally aggregated into one blob)
//! and one invocation per input. Handles come back in input order no matter
//! in which order the invocations complete.

pub mod aggregation;
pub mod args;
mod dispatch;
pub mod metadata;
pub mod options;
mod packaging;
mod reduce;

pub use aggregation::{agg_data, should_aggregate, AggregatedPayload};
pub use args::{validate_extra_meta, InvocationArguments, FANOUT_VERSION, RESERVED_FIELDS};
pub use metadata::HostJobMetadata;
pub use options::MapOptions;

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{FanoutConfig, MAX_AGG_DATA_SIZE};
use crate::error::{FanoutError, Result};
use crate::future::ResponseFuture;
use crate::invoker::{Invoker, RandomShardSelector, ShardSelector};
use crate::runtime::{RuntimeConfig, RuntimeInfo};
use crate::serialize::{JsonSerializer, RemoteFunction, Serializer};
use crate::storage::{keys, BlobStore};
use dispatch::{CallPayload, CallSpec, CallsetContext};

pub struct Executor {
    invoker: Arc<dyn Invoker>,
    store: Arc<dyn BlobStore>,
    serializer: Arc<dyn Serializer>,
    shard_selector: Arc<dyn ShardSelector>,
    runtime: RuntimeConfig,
    runtime_info: RuntimeInfo,
    job_max_runtime: Duration,
    map_item_limit: Option<usize>,
    max_agg_data_size: usize,
    poll_interval: Duration,
}

impl Executor {
    pub fn new(invoker: Arc<dyn Invoker>, store: Arc<dyn BlobStore>) -> Self {
        Self {
            invoker,
            store,
            serializer: Arc::new(JsonSerializer::new()),
            shard_selector: Arc::new(RandomShardSelector),
            runtime: RuntimeConfig::default(),
            runtime_info: RuntimeInfo::default(),
            job_max_runtime: Duration::from_secs(300),
            map_item_limit: None,
            max_agg_data_size: MAX_AGG_DATA_SIZE,
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn from_config(
        config: &FanoutConfig,
        invoker: Arc<dyn Invoker>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            runtime: config.runtime.clone(),
            job_max_runtime: config.invoke.job_max_runtime,
            map_item_limit: config.scheduler.map_item_limit,
            max_agg_data_size: config.invoke.max_agg_data_size,
            poll_interval: config.invoke.poll_interval,
            ..Self::new(invoker, store)
        }
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_shard_selector(mut self, selector: Arc<dyn ShardSelector>) -> Self {
        self.shard_selector = selector;
        self
    }

    /// Use `info` for shard selection and module filtering
    ///
    /// Replaces the serializer with a [`JsonSerializer`] that skips the
    /// runtime's preinstalls; call [`with_serializer`](Self::with_serializer)
    /// afterwards to keep a custom one.
    pub fn with_runtime_info(mut self, info: RuntimeInfo) -> Self {
        self.serializer = Arc::new(JsonSerializer::with_preinstalls(info.preinstalls.iter().cloned()));
        self.runtime_info = info;
        self
    }

    /// Read runtime metadata from the store, keeping defaults if none is published
    pub async fn load_runtime_info(self) -> Result<Self> {
        match RuntimeInfo::load(self.store.as_ref(), &self.runtime).await {
            Ok(info) => Ok(self.with_runtime_info(info)),
            Err(e) if e.is_not_found() => {
                debug!("No runtime metadata at {}", self.runtime.meta_key());
                Ok(self)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn with_map_item_limit(mut self, limit: Option<usize>) -> Self {
        self.map_item_limit = limit;
        self
    }

    pub fn with_job_max_runtime(mut self, runtime: Duration) -> Self {
        self.job_max_runtime = runtime;
        self
    }

    pub fn with_max_agg_data_size(mut self, size: usize) -> Self {
        self.max_agg_data_size = size;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn runtime_info(&self) -> &RuntimeInfo {
        &self.runtime_info
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Dispatch `func` once per input
    ///
    /// The i-th returned handle belongs to the i-th input. Every invocation is
    /// attempted even if some fail; the first failure in input order is
    /// returned. A callset holds at most
    /// [`MAX_CALLS_PER_CALLSET`](keys::MAX_CALLS_PER_CALLSET) inputs whatever
    /// the configured item limit.
    pub async fn map<T: Serialize>(
        &self,
        func: &RemoteFunction,
        inputs: &[T],
        opts: &MapOptions,
    ) -> Result<Vec<ResponseFuture>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self
            .map_item_limit
            .map_or(keys::MAX_CALLS_PER_CALLSET, |l| l.min(keys::MAX_CALLS_PER_CALLSET));
        if inputs.len() > limit {
            return Err(FanoutError::MapItemLimitExceeded {
                items: inputs.len(),
                limit,
            });
        }
        if let Some(meta) = &opts.extra_meta {
            validate_extra_meta(meta)?;
        }

        let values = inputs
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<Value>, _>>()?;

        let callset_id = keys::create_callset_id();
        let prefix = self.store.prefix().to_string();
        info!(
            "map {} {} of {} items",
            callset_id,
            func.callable.label(),
            values.len()
        );

        let mut host_job_meta = HostJobMetadata::default();
        let packaged = self
            .package_job(func, &values, &callset_id, opts, &mut host_job_meta)
            .await?;

        let data_size_bytes: usize = packaged.data.iter().map(Vec::len).sum();
        host_job_meta.data_size_bytes = data_size_bytes;

        let aggregated = if should_aggregate(opts.data_all_as_one, data_size_bytes, self.max_agg_data_size) {
            Some(agg_data(&packaged.data))
        } else {
            None
        };

        let calls: Vec<CallSpec> = match aggregated {
            Some(AggregatedPayload { bytes, ranges }) => {
                let agg_key = keys::create_agg_data_key(&prefix, &callset_id);
                let start = Instant::now();
                self.store.put(&agg_key, bytes).await?;
                host_job_meta.agg_data = true;
                host_job_meta.record_data_upload(start.elapsed());
                info!(
                    "map {} aggregated data upload complete {} ({} bytes)",
                    callset_id, agg_key, data_size_bytes
                );

                ranges
                    .into_iter()
                    .enumerate()
                    .map(|(index, range)| CallSpec {
                        call_id: keys::create_call_id(index),
                        payload: CallPayload::Aggregated {
                            key: agg_key.clone(),
                            range,
                        },
                    })
                    .collect()
            }
            None => packaged
                .data
                .into_iter()
                .enumerate()
                .map(|(index, bytes)| CallSpec {
                    call_id: keys::create_call_id(index),
                    payload: CallPayload::Individual(bytes),
                })
                .collect(),
        };

        let ctx = Arc::new(CallsetContext {
            callset_id: callset_id.clone(),
            prefix,
            func_key: packaged.func_key,
            storage_config: self.store.config().clone(),
            runtime: self.runtime.clone(),
            shard_urls: self.runtime_info.shard_urls().map(<[String]>::to_vec),
            job_max_runtime: whole_seconds(self.job_max_runtime),
            use_cached_runtime: opts.use_cached_runtime,
            extra_env: opts.extra_env.clone(),
            extra_meta: opts.extra_meta.clone(),
            overrides: opts.overwrite_invoke_args.clone(),
            host_job_meta,
            poll_interval: self.poll_interval,
            store: self.store.clone(),
            invoker: self.invoker.clone(),
            shard_selector: self.shard_selector.clone(),
        });

        info!("map {} {} apply async", callset_id, calls.len());
        dispatch::invoke_all(ctx, calls, opts.pool_size()).await
    }

    /// Dispatch `func` on a single input
    pub async fn call_async<T: Serialize>(
        &self,
        func: &RemoteFunction,
        input: T,
        opts: &MapOptions,
    ) -> Result<ResponseFuture> {
        let mut futures = self.map(func, &[input], opts).await?;
        futures.pop().ok_or(FanoutError::NoHandle)
    }
}

/// Deadline in whole seconds, rounding any fraction up
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
