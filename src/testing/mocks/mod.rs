//! Mock implementations of the collaborator traits

pub mod invoker;

pub use invoker::{MockInvoker, MockInvokerBuilder};
