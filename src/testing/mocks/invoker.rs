//! Mock invocation backend for testing

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::executor::InvocationArguments;
use crate::invoker::{Invoker, InvokerError, LocalInvoker};
use crate::storage::BlobStore;
use crate::worker::FunctionRegistry;

/// Builder for creating configured mock invokers
#[derive(Default)]
pub struct MockInvokerBuilder {
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    config: BTreeMap<String, Value>,
    executor: Option<(Arc<dyn BlobStore>, FunctionRegistry)>,
}

impl MockInvokerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the invocation of `call_id` for `delay` before accepting it
    pub fn with_delay(mut self, call_id: &str, delay: Duration) -> Self {
        self.delays.insert(call_id.to_string(), delay);
        self
    }

    /// Reject the invocation of `call_id`
    pub fn with_failure(mut self, call_id: &str) -> Self {
        self.failures.insert(call_id.to_string());
        self
    }

    pub fn with_config(mut self, key: &str, value: Value) -> Self {
        self.config.insert(key.to_string(), value);
        self
    }

    /// Actually run accepted calls against `store`
    pub fn executing(mut self, store: Arc<dyn BlobStore>, registry: FunctionRegistry) -> Self {
        self.executor = Some((store, registry));
        self
    }

    pub fn build(self) -> MockInvoker {
        MockInvoker {
            delays: self.delays,
            failures: self.failures,
            config: self.config,
            local: self
                .executor
                .map(|(store, registry)| LocalInvoker::new(store, registry)),
            call_history: Arc::new(Mutex::new(Vec::new())),
            completion_order: Arc::new(Mutex::new(Vec::new())),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

/// Invoker that records every invocation record it receives
pub struct MockInvoker {
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    config: BTreeMap<String, Value>,
    local: Option<LocalInvoker>,
    call_history: Arc<Mutex<Vec<InvocationArguments>>>,
    completion_order: Arc<Mutex<Vec<String>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockInvoker {
    fn default() -> Self {
        MockInvokerBuilder::new().build()
    }
}

impl MockInvoker {
    pub fn builder() -> MockInvokerBuilder {
        MockInvokerBuilder::new()
    }

    /// Records received so far, in arrival order
    pub fn calls(&self) -> Vec<InvocationArguments> {
        self.call_history.lock().unwrap().clone()
    }

    pub fn call(&self, call_id: &str) -> Option<InvocationArguments> {
        self.call_history
            .lock()
            .unwrap()
            .iter()
            .find(|args| args.call_id == call_id)
            .cloned()
    }

    pub fn invocation_count(&self) -> usize {
        self.call_history.lock().unwrap().len()
    }

    /// Call ids in the order their invocations returned
    pub fn completion_order(&self) -> Vec<String> {
        self.completion_order.lock().unwrap().clone()
    }

    /// Highest number of invocations observed running at once
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until every executed call has written its status
    pub async fn wait_idle(&self) {
        if let Some(local) = &self.local {
            local.wait_idle().await;
        }
    }
}

#[async_trait]
impl Invoker for MockInvoker {
    async fn invoke(&self, args: &InvocationArguments) -> Result<(), InvokerError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&args.call_id) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.call_history.lock().unwrap().push(args.clone());

        if self.failures.contains(&args.call_id) {
            return Err(InvokerError::rejected(format!(
                "mock rejected call {}",
                args.call_id
            )));
        }

        if let Some(local) = &self.local {
            local.invoke(args).await?;
        }
        self.completion_order
            .lock()
            .unwrap()
            .push(args.call_id.clone());
        Ok(())
    }

    fn config(&self) -> BTreeMap<String, Value> {
        let mut config = BTreeMap::from([("invoker".to_string(), Value::from("mock"))]);
        config.extend(self.config.clone());
        config
    }
}
