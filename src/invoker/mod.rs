//! Invocation backends
//!
//! An [`Invoker`] accepts an [`InvocationArguments`] record and triggers the
//! remote unit. It returns as soon as the invocation is accepted; completion
//! is observed later through the status key.

pub mod local;
pub mod shard;

pub use local::LocalInvoker;
pub use shard::{FixedShardSelector, RandomShardSelector, RoundRobinShardSelector, ShardSelector};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::executor::InvocationArguments;

#[derive(Error, Debug)]
pub enum InvokerError {
    #[error("Invocation rejected: {0}")]
    Rejected(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invoker error: {0}")]
    Other(#[from] anyhow::Error),
}

impl InvokerError {
    pub fn rejected<E: std::fmt::Display>(msg: E) -> Self {
        Self::Rejected(msg.to_string())
    }
}

#[async_trait]
pub trait Invoker: Send + Sync {
    /// Trigger execution of one call
    async fn invoke(&self, args: &InvocationArguments) -> Result<(), InvokerError>;

    /// Backend-specific configuration recorded in each call's metadata
    fn config(&self) -> BTreeMap<String, Value>;
}
