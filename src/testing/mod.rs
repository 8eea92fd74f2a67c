//! Testing utilities and fixtures
//!
//! Helpers for driving an [`Executor`] against an in-memory store and a mock
//! invocation backend.

pub mod mocks;

pub use mocks::{MockInvoker, MockInvokerBuilder};

use std::sync::Arc;
use std::time::Duration;

use crate::executor::Executor;
use crate::storage::{BlobStore, MemoryBlobStore};
use crate::worker::FunctionRegistry;

/// Storage prefix used by [`TestContext`]
pub const TEST_PREFIX: &str = "fanout.test";

/// An in-memory store paired with a mock invoker
pub struct TestContext {
    pub store: MemoryBlobStore,
    pub invoker: Arc<MockInvoker>,
}

impl TestContext {
    /// Context whose invoker only records calls
    pub fn new() -> Self {
        Self::with_invoker(|builder| builder)
    }

    /// Context whose invoker runs calls with the builtin functions
    pub fn executing() -> Self {
        let store = MemoryBlobStore::with_prefix(TEST_PREFIX);
        let shared: Arc<dyn BlobStore> = Arc::new(store.clone());
        let invoker = MockInvoker::builder()
            .executing(shared, FunctionRegistry::with_builtins())
            .build();
        Self {
            store,
            invoker: Arc::new(invoker),
        }
    }

    /// Context with a customised invoker
    pub fn with_invoker<F>(configure: F) -> Self
    where
        F: FnOnce(MockInvokerBuilder) -> MockInvokerBuilder,
    {
        Self {
            store: MemoryBlobStore::with_prefix(TEST_PREFIX),
            invoker: Arc::new(configure(MockInvoker::builder()).build()),
        }
    }

    pub fn store_handle(&self) -> Arc<dyn BlobStore> {
        Arc::new(self.store.clone())
    }

    /// Executor wired to this context, polling every few milliseconds
    pub fn executor(&self) -> Executor {
        Executor::new(self.invoker.clone(), self.store_handle())
            .with_poll_interval(Duration::from_millis(5))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
