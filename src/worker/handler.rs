//! Runs one call: the remote side of an invocation

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::FunctionRegistry;
use crate::executor::InvocationArguments;
use crate::future::{CallOutcome, CallStatus, FutureRef};
use crate::serialize::{Callable, FunctionPackage};
use crate::storage::{BlobStore, StorageResult};

/// Execute the call described by `args` and publish its status
///
/// Failures of the user function, missing blobs and undecodable payloads all
/// become an error status. Only a failure to write the status itself is
/// returned to the caller.
pub async fn handle(
    store: &dyn BlobStore,
    registry: &FunctionRegistry,
    args: &InvocationArguments,
) -> StorageResult<CallStatus> {
    let start_time = Utc::now();

    let outcome = match store.exists(&args.cancel_key).await {
        Ok(true) => {
            info!("call {} {} cancelled before start", args.callset_id, args.call_id);
            CallOutcome::Cancelled
        }
        Ok(false) => match run_call(store, registry, args).await {
            Ok(output) => {
                store
                    .put(&args.output_key, serde_json::to_vec(&output)?)
                    .await?;
                CallOutcome::Success
            }
            Err(e) => {
                warn!("call {} {} failed: {:#}", args.callset_id, args.call_id, e);
                CallOutcome::Error {
                    message: format!("{:#}", e),
                }
            }
        },
        Err(e) => {
            warn!(
                "call {} {} could not check cancel marker {}: {}",
                args.callset_id, args.call_id, args.cancel_key, e
            );
            CallOutcome::Error {
                message: format!("checking cancel marker {}: {}", args.cancel_key, e),
            }
        }
    };

    let status = CallStatus {
        callset_id: args.callset_id.clone(),
        call_id: args.call_id.clone(),
        outcome,
        start_time,
        end_time: Utc::now(),
    };
    store
        .put(&args.status_key, serde_json::to_vec(&status)?)
        .await?;
    debug!("call {} {} status written", args.callset_id, args.call_id);
    Ok(status)
}

async fn run_call(
    store: &dyn BlobStore,
    registry: &FunctionRegistry,
    args: &InvocationArguments,
) -> Result<Value> {
    let package_bytes = store
        .get(&args.func_key)
        .await
        .with_context(|| format!("loading function package {}", args.func_key))?;
    let package = FunctionPackage::from_bytes(&package_bytes)?;
    let callable: Callable =
        serde_json::from_slice(&package.func).context("decoding callable")?;

    let data = match args.data_byte_range {
        Some(range) => store.get_range(&args.data_key, range).await,
        None => store.get(&args.data_key).await,
    }
    .with_context(|| format!("loading input {}", args.data_key))?;
    let input: Value = serde_json::from_slice(&data).context("decoding input")?;

    execute(store, registry, &callable, input).await
}

/// Apply `callable` to `input`
fn execute<'a>(
    store: &'a dyn BlobStore,
    registry: &'a FunctionRegistry,
    callable: &'a Callable,
    input: Value,
) -> BoxFuture<'a, Result<Value>> {
    async move {
        let result = match callable {
            Callable::Registered { name } => registry.call(name, input),
            Callable::Reduce { inner } => {
                let refs: Vec<FutureRef> =
                    serde_json::from_value(input).context("decoding reduce inputs")?;
                let mut results = Vec::with_capacity(refs.len());
                for future in &refs {
                    let bytes = store.get(&future.output_key).await.with_context(|| {
                        format!("reading result of {}/{}", future.callset_id, future.call_id)
                    })?;
                    results.push(serde_json::from_slice::<Value>(&bytes)?);
                }
                execute(store, registry, inner, Value::Array(results)).await
            }
        };
        result.map_err(|e| anyhow!("{} failed: {:#}", callable.label(), e))
    }
    .boxed()
}
