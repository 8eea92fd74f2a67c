//! Remote-callable identifiers
//!
//! Remote units cannot receive closures, so every callable is a tagged
//! reference to a function registered on the worker side.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a remote unit should run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Callable {
    /// A function registered under `name`
    Registered { name: String },
    /// Read the results of a list of calls, in order, and pass them to `inner`
    Reduce { inner: Box<Callable> },
}

impl Callable {
    /// Short label for logging
    pub fn label(&self) -> String {
        match self {
            Callable::Registered { name } => name.clone(),
            Callable::Reduce { inner } => format!("reduce({})", inner.label()),
        }
    }
}

/// Caller-side description of a function to map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFunction {
    pub callable: Callable,
    /// Module files shipped with the function package
    pub modules: Vec<PathBuf>,
}

impl RemoteFunction {
    /// Reference a function registered on the worker under `name`
    pub fn registered(name: impl Into<String>) -> Self {
        Self {
            callable: Callable::Registered { name: name.into() },
            modules: Vec::new(),
        }
    }

    /// Attach a module dependency
    pub fn with_module(mut self, path: impl Into<PathBuf>) -> Self {
        self.modules.push(path.into());
        self
    }

    /// Wrap `inner` so that it receives the ordered results of earlier calls
    pub fn reduce(inner: &RemoteFunction) -> Self {
        Self {
            callable: Callable::Reduce {
                inner: Box::new(inner.callable.clone()),
            },
            modules: inner.modules.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_callable_tagging() {
        let callable = RemoteFunction::reduce(&RemoteFunction::registered("sum")).callable;
        let value = serde_json::to_value(&callable).unwrap();
        assert_eq!(
            value,
            json!({"kind": "reduce", "inner": {"kind": "registered", "name": "sum"}})
        );

        let parsed: Callable = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, callable);
        assert_eq!(parsed.label(), "reduce(sum)");
    }

    #[test]
    fn test_reduce_keeps_inner_modules() {
        let inner = RemoteFunction::registered("sum").with_module("modules/helpers.bin");
        let reduce = RemoteFunction::reduce(&inner);
        assert_eq!(reduce.modules, inner.modules);
    }
}
