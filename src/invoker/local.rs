//! In-process invocation backend

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{Invoker, InvokerError};
use crate::executor::InvocationArguments;
use crate::future::{CallOutcome, CallStatus};
use crate::storage::BlobStore;
use crate::worker::{self, FunctionRegistry};

/// Runs each call on a tokio task against a shared blob store
///
/// The store must be the same instance the executor writes to.
pub struct LocalInvoker {
    store: Arc<dyn BlobStore>,
    registry: Arc<FunctionRegistry>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl LocalInvoker {
    pub fn new(store: Arc<dyn BlobStore>, registry: FunctionRegistry) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Wait for every call started so far to publish its status
    pub async fn wait_idle(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.in_flight.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Local call task panicked: {}", e);
            }
        }
    }

    /// Tasks still tracked for `wait_idle`
    #[cfg(test)]
    async fn tracked_tasks(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

async fn run_with_deadline(
    store: Arc<dyn BlobStore>,
    registry: Arc<FunctionRegistry>,
    args: InvocationArguments,
) {
    let deadline = Duration::from_secs(args.job_max_runtime);
    let start_time = Utc::now();

    match tokio::time::timeout(deadline, worker::handle(store.as_ref(), &registry, &args)).await {
        Ok(Ok(status)) => debug!(
            "local call {} {} finished: {:?}",
            args.callset_id, args.call_id, status.outcome
        ),
        Ok(Err(e)) => error!(
            "local call {} {} could not publish status: {}",
            args.callset_id, args.call_id, e
        ),
        Err(_) => {
            warn!(
                "local call {} {} exceeded job_max_runtime of {}s",
                args.callset_id, args.call_id, args.job_max_runtime
            );
            let status = CallStatus {
                callset_id: args.callset_id.clone(),
                call_id: args.call_id.clone(),
                outcome: CallOutcome::Error {
                    message: format!("exceeded job_max_runtime of {}s", args.job_max_runtime),
                },
                start_time,
                end_time: Utc::now(),
            };
            let written = match serde_json::to_vec(&status) {
                Ok(bytes) => store.put(&args.status_key, bytes).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(e) = written {
                error!("failed to record timeout for {}: {}", args.call_id, e);
            }
        }
    }
}

#[async_trait]
impl Invoker for LocalInvoker {
    async fn invoke(&self, args: &InvocationArguments) -> Result<(), InvokerError> {
        if args.job_max_runtime == 0 {
            return Err(InvokerError::rejected("job_max_runtime must be positive"));
        }

        let handle = tokio::spawn(run_with_deadline(
            self.store.clone(),
            self.registry.clone(),
            args.clone(),
        ));
        let mut in_flight = self.in_flight.lock().await;
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
        debug!("local invoker tracking {} tasks", in_flight.len());
        Ok(())
    }

    fn config(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("invoker".to_string(), json!("local")),
            ("functions".to_string(), json!(self.registry.names())),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RuntimeConfig;
    use crate::storage::{keys, MemoryBlobStore, StorageConfig};

    fn args(job_max_runtime: u64) -> InvocationArguments {
        let call_keys = keys::create_keys("jobs", "cs", "00000");
        InvocationArguments {
            storage_config: StorageConfig::memory("jobs"),
            func_key: keys::create_func_key("jobs", "cs"),
            data_key: call_keys.data_key,
            output_key: call_keys.output_key,
            status_key: call_keys.status_key,
            cancel_key: call_keys.cancel_key,
            callset_id: "cs".to_string(),
            call_id: "00000".to_string(),
            job_max_runtime,
            data_byte_range: None,
            use_cached_runtime: true,
            runtime: RuntimeConfig::default(),
            fanout_version: "test".to_string(),
            runtime_url: None,
            host_submit_time: Utc::now(),
            extra_env: None,
            extra_meta: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_rejects_zero_deadline() {
        let store = Arc::new(MemoryBlobStore::with_prefix("jobs"));
        let invoker = LocalInvoker::new(store, FunctionRegistry::with_builtins());

        let err = invoker.invoke(&args(0)).await.unwrap_err();
        assert!(matches!(err, InvokerError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_missing_package_still_publishes_status() {
        let store = MemoryBlobStore::with_prefix("jobs");
        let invoker = LocalInvoker::new(Arc::new(store.clone()), FunctionRegistry::with_builtins());
        let args = args(30);

        invoker.invoke(&args).await.unwrap();
        invoker.wait_idle().await;

        let status: CallStatus =
            serde_json::from_slice(&store.get(&args.status_key).await.unwrap()).unwrap();
        assert!(matches!(status.outcome, CallOutcome::Error { .. }));
        assert_eq!(invoker.config()["invoker"], json!("local"));
    }

    #[tokio::test]
    async fn test_finished_tasks_are_not_retained() {
        let store = MemoryBlobStore::with_prefix("jobs");
        let invoker = LocalInvoker::new(Arc::new(store.clone()), FunctionRegistry::with_builtins());

        for i in 0..200 {
            let mut args = args(30);
            args.call_id = keys::create_call_id(i);
            args.status_key = keys::create_keys("jobs", "cs", &args.call_id).status_key;
            invoker.invoke(&args).await.unwrap();
        }

        for i in 0..200 {
            let status_key = keys::create_keys("jobs", "cs", &keys::create_call_id(i)).status_key;
            while !store.exists(&status_key).await.unwrap() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        invoker.invoke(&args(30)).await.unwrap();
        assert!(invoker.tracked_tasks().await <= 2);

        invoker.wait_idle().await;
        assert_eq!(invoker.tracked_tasks().await, 0);
    }
}
