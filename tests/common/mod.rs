//! Common test utilities and helpers

#![allow(dead_code)]

use fanout::future::ResponseFuture;
use fanout::serialize::RemoteFunction;
use serde_json::Value;

pub fn square() -> RemoteFunction {
    RemoteFunction::registered("square")
}

pub fn sum() -> RemoteFunction {
    RemoteFunction::registered("sum")
}

/// Resolve every handle in order
pub async fn collect_results(futures: &mut [ResponseFuture]) -> Vec<Value> {
    let mut results = Vec::with_capacity(futures.len());
    for future in futures.iter_mut() {
        results.push(future.result::<Value>().await.unwrap());
    }
    results
}

/// Keys under `prefix` ending with `suffix`
pub fn keys_ending_with(keys: &[String], suffix: &str) -> Vec<String> {
    keys.iter().filter(|k| k.ends_with(suffix)).cloned().collect()
}
