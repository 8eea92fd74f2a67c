//! The remote side of a call
//!
//! A real deployment runs [`handle`] inside the remote compute unit. The
//! [`LocalInvoker`](crate::invoker::LocalInvoker) runs it in-process on a tokio
//! task, which is what the CLI and the tests use.

pub mod handler;
pub mod registry;

pub use handler::handle;
pub use registry::{FunctionRegistry, RegisteredFn};
