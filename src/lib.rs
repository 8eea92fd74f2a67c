//! # fanout
//!
//! Apply a function to many inputs by dispatching each input as an
//! independent call to a remote compute backend, then combine the results.
//!
//! ## Usage
//!
//! ```bash
//! fanout run --function square --reduce sum 1 2 3
//! ```
//!
//! ## Modules
//!
//! - `executor` - Map/reduce orchestration: packaging, aggregation, fan-out
//! - `future` - Result handles and the polling wait utility
//! - `storage` - Blob store trait, key scheme and backends
//! - `invoker` - Invocation backends and shard selection
//! - `serialize` - Callables, function packages and the serializer trait
//! - `worker` - The remote side: function registry and call handler
//! - `runtime` - Runtime metadata (preinstalls, shard endpoints)
//! - `config` - TOML configuration with environment overrides
//! - `testing` - Mock invoker and test context
pub mod app;
pub mod config;
pub mod error;
pub mod executor;
pub mod future;
pub mod invoker;
pub mod runtime;
pub mod serialize;
pub mod storage;
pub mod worker;

pub mod testing;

pub use error::{FanoutError, Result};
pub use executor::{Executor, MapOptions};
pub use future::{wait, JobState, ResponseFuture, ReturnWhen};
pub use serialize::RemoteFunction;
