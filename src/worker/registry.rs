//! Functions a remote unit knows how to run

use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type RegisteredFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Name to function lookup used by the worker
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `identity`, `square`, `sum` and `count`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("identity", |input| Ok(input));
        registry.register("square", square);
        registry.register("sum", sum);
        registry.register("count", |input| {
            let items = input
                .as_array()
                .ok_or_else(|| anyhow!("count expects a list, got {}", input))?;
            Ok(Value::from(items.len()))
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(func));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn call(&self, name: &str, input: Value) -> Result<Value> {
        let func = self
            .functions
            .get(name)
            .ok_or_else(|| anyhow!("function {} is not registered", name))?;
        func(input)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

fn square(input: Value) -> Result<Value> {
    if let Some(n) = input.as_i64() {
        return n
            .checked_mul(n)
            .map(Value::from)
            .ok_or_else(|| anyhow!("square of {} overflows", n));
    }
    match input.as_f64() {
        Some(x) => Ok(Value::from(x * x)),
        None => bail!("square expects a number, got {}", input),
    }
}

fn sum(input: Value) -> Result<Value> {
    let items = input
        .as_array()
        .ok_or_else(|| anyhow!("sum expects a list, got {}", input))?;

    if items.iter().all(Value::is_i64) {
        let mut total: i64 = 0;
        for n in items.iter().filter_map(Value::as_i64) {
            total = total
                .checked_add(n)
                .ok_or_else(|| anyhow!("sum overflows"))?;
        }
        return Ok(Value::from(total));
    }

    let mut total = 0.0;
    for item in items {
        total += item
            .as_f64()
            .ok_or_else(|| anyhow!("sum expects numbers, got {}", item))?;
    }
    Ok(Value::from(total))
}
