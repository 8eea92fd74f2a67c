//! Bounded parallel invocation of a callset's calls

use chrono::Utc;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::args::{InvocationArguments, FANOUT_VERSION};
use super::metadata::HostJobMetadata;
use crate::error::{FanoutError, Result};
use crate::future::{JobState, ResponseFuture};
use crate::invoker::{Invoker, InvokerError, ShardSelector};
use crate::runtime::RuntimeConfig;
use crate::storage::{keys, BlobStore, ByteRange, StorageConfig};

/// Read-only state shared by every call of one callset
pub(crate) struct CallsetContext {
    pub callset_id: String,
    pub prefix: String,
    pub func_key: String,
    pub storage_config: StorageConfig,
    pub runtime: RuntimeConfig,
    pub shard_urls: Option<Vec<String>>,
    pub job_max_runtime: u64,
    pub use_cached_runtime: bool,
    pub extra_env: Option<BTreeMap<String, String>>,
    pub extra_meta: Option<BTreeMap<String, Value>>,
    pub overrides: Option<Map<String, Value>>,
    pub host_job_meta: HostJobMetadata,
    pub poll_interval: Duration,
    pub store: Arc<dyn BlobStore>,
    pub invoker: Arc<dyn Invoker>,
    pub shard_selector: Arc<dyn ShardSelector>,
}

/// Where a call's input lives
pub(crate) enum CallPayload {
    /// Slice of the callset's aggregated blob
    Aggregated { key: String, range: ByteRange },
    /// Own blob, uploaded right before invocation
    Individual(Vec<u8>),
}

pub(crate) struct CallSpec {
    pub call_id: String,
    pub payload: CallPayload,
}

/// Upload, describe and invoke one call
async fn invoke_call(ctx: Arc<CallsetContext>, call: CallSpec) -> Result<ResponseFuture> {
    let call_keys = keys::create_keys(&ctx.prefix, &ctx.callset_id, &call.call_id);
    let mut host_job_meta = ctx.host_job_meta.clone();

    let (data_key, data_byte_range) = match call.payload {
        CallPayload::Aggregated { key, range } => (key, Some(range)),
        CallPayload::Individual(bytes) => {
            let start = Instant::now();
            ctx.store.put(&call_keys.data_key, bytes).await?;
            host_job_meta.record_data_upload(start.elapsed());
            info!(
                "call_async {} {} data upload complete {}",
                ctx.callset_id, call.call_id, call_keys.data_key
            );
            (call_keys.data_key.clone(), None)
        }
    };

    let mut args = InvocationArguments {
        storage_config: ctx.storage_config.clone(),
        func_key: ctx.func_key.clone(),
        data_key,
        output_key: call_keys.output_key,
        status_key: call_keys.status_key,
        cancel_key: call_keys.cancel_key,
        callset_id: ctx.callset_id.clone(),
        call_id: call.call_id.clone(),
        job_max_runtime: ctx.job_max_runtime,
        data_byte_range,
        use_cached_runtime: ctx.use_cached_runtime,
        runtime: ctx.runtime.clone(),
        fanout_version: FANOUT_VERSION.to_string(),
        runtime_url: None,
        host_submit_time: Utc::now(),
        extra_env: ctx.extra_env.clone(),
        extra_meta: BTreeMap::new(),
    };

    if let Some(meta) = &ctx.extra_meta {
        args.merge_extra_meta(meta)?;
    }

    if let Some(urls) = ctx.shard_urls.as_deref() {
        args.runtime_url = ctx.shard_selector.choose(urls);
        debug!(
            "call {} {} assigned to shard {:?}",
            ctx.callset_id, call.call_id, args.runtime_url
        );
    }

    if let Some(overrides) = &ctx.overrides {
        args = args.apply_overrides(overrides)?;
    }

    host_job_meta.job_invoke_timestamp = Some(args.host_submit_time);
    let invoke_started = Utc::now();
    let start = Instant::now();
    ctx.invoker.invoke(&args).await?;
    host_job_meta.record_invoke(invoke_started, start.elapsed());
    host_job_meta.merge_backend_config(ctx.invoker.config());
    info!(
        "call_async {} {} invoke complete in {:.3}s",
        ctx.callset_id,
        call.call_id,
        start.elapsed().as_secs_f64()
    );

    host_job_meta.invoke_args = Some(args.clone());
    let mut future = ResponseFuture::new(&args, host_job_meta, ctx.store.clone(), ctx.poll_interval);
    future.set_state(JobState::Invoked);
    Ok(future)
}

/// Invoke every call with at most `pool_size` in flight
///
/// All tasks run to completion. Handles are collected by submission index;
/// the first failed call in that order becomes the error.
pub(crate) async fn invoke_all(
    ctx: Arc<CallsetContext>,
    calls: Vec<CallSpec>,
    pool_size: usize,
) -> Result<Vec<ResponseFuture>> {
    let semaphore = Arc::new(Semaphore::new(pool_size));
    let mut call_ids = Vec::with_capacity(calls.len());
    let mut handles: Vec<JoinHandle<Result<ResponseFuture>>> = Vec::with_capacity(calls.len());

    for call in calls {
        call_ids.push(call.call_id.clone());
        let ctx = ctx.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| InvokerError::Unavailable(format!("invoke pool closed: {}", e)))?;
            invoke_call(ctx, call).await
        }));
    }

    let results = join_all(handles).await;

    let mut futures = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (call_id, joined) in call_ids.into_iter().zip(results) {
        let outcome = joined
            .map_err(|source| FanoutError::TaskJoin {
                call_id: call_id.clone(),
                source,
            })
            .and_then(|result| result);

        match outcome {
            Ok(future) => futures.push(future),
            Err(e) => {
                warn!("map {} call {} failed: {}", ctx.callset_id, call_id, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(futures),
    }
}
