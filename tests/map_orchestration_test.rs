//! Map dispatch: keys, ordering, batching, metadata and failure isolation

mod common;

use common::{keys_ending_with, square};
use fanout::error::FanoutError;
use fanout::executor::MapOptions;
use fanout::invoker::{InvokerError, RoundRobinShardSelector};
use fanout::runtime::RuntimeInfo;
use fanout::serialize::{FunctionPackage, RemoteFunction};
use fanout::storage::{keys, BlobStore};
use fanout::testing::{TestContext, TEST_PREFIX};
use fanout::JobState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_empty_map_touches_nothing() {
    let ctx = TestContext::new();
    let executor = ctx.executor();

    let futures = executor
        .map(&square(), &Vec::<i64>::new(), &MapOptions::default())
        .await
        .unwrap();

    assert!(futures.is_empty());
    assert_eq!(ctx.store.put_count(), 0);
    assert_eq!(ctx.invoker.invocation_count(), 0);
}

#[tokio::test]
async fn test_item_limit_rejected_before_any_work() {
    let ctx = TestContext::new();
    let executor = ctx.executor().with_map_item_limit(Some(2));

    let err = executor
        .map(&square(), &[1, 2, 3], &MapOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FanoutError::MapItemLimitExceeded { items: 3, limit: 2 }
    ));
    assert!(err.is_validation());
    assert_eq!(ctx.store.put_count(), 0);
    assert_eq!(ctx.invoker.invocation_count(), 0);

    // At the limit is fine
    let futures = executor
        .map(&square(), &[1, 2], &MapOptions::default())
        .await
        .unwrap();
    assert_eq!(futures.len(), 2);
}

#[tokio::test]
async fn test_callset_size_capped_by_call_id_width() {
    let ctx = TestContext::new();
    let inputs = vec![0u8; keys::MAX_CALLS_PER_CALLSET + 1];

    for limit in [None, Some(keys::MAX_CALLS_PER_CALLSET * 2)] {
        let err = ctx
            .executor()
            .with_map_item_limit(limit)
            .map(&square(), &inputs, &MapOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FanoutError::MapItemLimitExceeded { limit: keys::MAX_CALLS_PER_CALLSET, .. }
        ));
    }
    assert_eq!(ctx.store.put_count(), 0);
    assert_eq!(ctx.invoker.invocation_count(), 0);
    assert_eq!(
        keys::create_call_id(keys::MAX_CALLS_PER_CALLSET - 1).len(),
        keys::CALL_ID_WIDTH
    );
}

#[tokio::test]
async fn test_sub_second_deadline_rounds_up() {
    let ctx = TestContext::new();
    let executor = ctx.executor().with_job_max_runtime(Duration::from_millis(500));
    executor
        .map(&square(), &[1], &MapOptions::default())
        .await
        .unwrap();
    assert_eq!(ctx.invoker.call("00000").unwrap().job_max_runtime, 1);

    let ctx = TestContext::new();
    let executor = ctx.executor().with_job_max_runtime(Duration::from_millis(2_001));
    executor
        .call_async(&square(), 2, &MapOptions::default())
        .await
        .unwrap();
    assert_eq!(ctx.invoker.call("00000").unwrap().job_max_runtime, 3);
}

#[tokio::test]
async fn test_call_ids_and_keys() {
    let ctx = TestContext::new();
    let futures = ctx
        .executor()
        .map(&square(), &[10, 20, 30], &MapOptions::default())
        .await
        .unwrap();

    let callset_id = futures[0].callset_id().to_string();
    assert_eq!(callset_id.len(), 32);

    for (i, future) in futures.iter().enumerate() {
        let call_id = keys::create_call_id(i);
        assert_eq!(future.call_id(), call_id);
        assert_eq!(future.callset_id(), callset_id);
        assert_eq!(future.state(), JobState::Invoked);
        assert_eq!(future.storage_path(), ("fanout", TEST_PREFIX));

        let call_prefix = format!("{}/{}/{}/", TEST_PREFIX, callset_id, call_id);
        assert_eq!(future.output_key(), format!("{call_prefix}output.json"));
        assert_eq!(future.status_key(), format!("{call_prefix}status.json"));
        assert_eq!(future.cancel_key(), format!("{call_prefix}cancel"));

        let args = ctx.invoker.call(&call_id).unwrap();
        assert_eq!(args.func_key, format!("{}/{}/func.json", TEST_PREFIX, callset_id));
        assert_eq!(args.job_max_runtime, 300);
        assert!(args.use_cached_runtime);
        assert_eq!(args.fanout_version, env!("CARGO_PKG_VERSION"));
    }

    // Cancel keys are allocated but never written
    let stored = ctx.store.keys().await;
    assert!(keys_ending_with(&stored, "/cancel").is_empty());
}

#[tokio::test]
async fn test_callsets_never_share_ids() {
    let ctx = TestContext::new();
    let executor = ctx.executor();

    let first = executor.call_async(&square(), 1, &MapOptions::default()).await.unwrap();
    let second = executor.call_async(&square(), 1, &MapOptions::default()).await.unwrap();

    assert_ne!(first.callset_id(), second.callset_id());
    assert_ne!(first.output_key(), second.output_key());
}

#[tokio::test]
async fn test_results_follow_input_order_not_completion_order() {
    let ctx = TestContext::with_invoker(|builder| {
        builder
            .with_delay("00000", Duration::from_millis(150))
            .with_delay("00002", Duration::from_millis(50))
    });
    let inputs = vec![json!("a"), json!("b"), json!("c"), json!("d")];

    let futures = ctx
        .executor()
        .map(&square(), &inputs, &MapOptions::default())
        .await
        .unwrap();

    let order = ctx.invoker.completion_order();
    assert_eq!(order.len(), 4);
    assert_eq!(order.last().map(String::as_str), Some("00000"));

    let agg_key = keys::create_agg_data_key(TEST_PREFIX, futures[0].callset_id());
    let blob = ctx.store.get(&agg_key).await.unwrap();
    for (i, future) in futures.iter().enumerate() {
        assert_eq!(future.call_id(), keys::create_call_id(i));

        let args = ctx.invoker.call(future.call_id()).unwrap();
        let range = args.data_byte_range.unwrap();
        let payload: Value = serde_json::from_slice(range.slice(&blob).unwrap()).unwrap();
        assert_eq!(payload, inputs[i]);
    }
}

#[tokio::test]
async fn test_pool_bounds_concurrent_invocations() {
    let ctx = TestContext::with_invoker(|mut builder| {
        for i in 0..6 {
            builder = builder.with_delay(&keys::create_call_id(i), Duration::from_millis(20));
        }
        builder
    });

    let opts = MapOptions::default().with_pool_threads(2);
    let futures = ctx
        .executor()
        .map(&square(), &[1, 2, 3, 4, 5, 6], &opts)
        .await
        .unwrap();

    assert_eq!(futures.len(), 6);
    assert!(ctx.invoker.max_concurrency() <= 2);

    // A zero-sized pool still makes progress
    let futures = ctx
        .executor()
        .map(&square(), &[1, 2], &MapOptions::default().with_pool_threads(0))
        .await
        .unwrap();
    assert_eq!(futures.len(), 2);
}

#[tokio::test]
async fn test_small_payloads_are_aggregated() {
    let ctx = TestContext::new();
    let futures = ctx
        .executor()
        .map(&square(), &[1, 22, 333], &MapOptions::default())
        .await
        .unwrap();

    let agg_key = keys::create_agg_data_key(TEST_PREFIX, futures[0].callset_id());
    let stored = ctx.store.keys().await;
    assert!(stored.contains(&agg_key));
    assert!(keys_ending_with(&stored, "/data.bin").is_empty());

    let mut expected_start = 0;
    for future in &futures {
        assert!(future.host_job_meta().agg_data);
        let args = ctx.invoker.call(future.call_id()).unwrap();
        assert_eq!(args.data_key, agg_key);
        let range = args.data_byte_range.unwrap();
        assert_eq!(range.start(), expected_start);
        expected_start = range.end();
    }
}

#[tokio::test]
async fn test_individual_uploads_without_aggregation() {
    let ctx = TestContext::new();
    let inputs = [json!(1), json!({"x": [1, 2]}), json!("three")];
    let opts = MapOptions::default().with_data_all_as_one(false);

    let futures = ctx
        .executor()
        .map(&square(), &inputs, &opts)
        .await
        .unwrap();

    let stored = ctx.store.keys().await;
    assert!(keys_ending_with(&stored, "aggdata.bin").is_empty());

    for (future, input) in futures.iter().zip(&inputs) {
        let args = ctx.invoker.call(future.call_id()).unwrap();
        assert!(args.data_byte_range.is_none());
        assert!(args.data_key.ends_with(&format!("{}/data.bin", future.call_id())));
        assert!(future.host_job_meta().data_upload_secs.is_some());

        let bytes = ctx.store.get(&args.data_key).await.unwrap();
        assert_eq!(bytes, serde_json::to_vec(input).unwrap());
    }
}

#[tokio::test]
async fn test_oversized_payloads_skip_aggregation() {
    let ctx = TestContext::new();
    let executor = ctx.executor().with_max_agg_data_size(4);

    let futures = executor
        .map(&square(), &[1000, 2000], &MapOptions::default())
        .await
        .unwrap();

    assert!(!futures[0].host_job_meta().agg_data);
    assert_eq!(keys_ending_with(&ctx.store.keys().await, "/data.bin").len(), 2);
}

#[tokio::test]
async fn test_metadata_merged_and_collisions_rejected() {
    let ctx = TestContext::new();
    let executor = ctx.executor();

    let opts = MapOptions::default()
        .with_extra_meta("team", json!("analytics"))
        .with_extra_env("MODE", "batch");
    executor.map(&square(), &[1], &opts).await.unwrap();

    let args = ctx.invoker.call("00000").unwrap();
    assert_eq!(args.extra_meta.get("team"), Some(&json!("analytics")));
    assert_eq!(args.extra_env.unwrap().get("MODE").map(String::as_str), Some("batch"));
    let record = serde_json::to_value(ctx.invoker.call("00000").unwrap()).unwrap();
    assert_eq!(record["team"], json!("analytics"));

    let puts_before = ctx.store.put_count();
    let invocations_before = ctx.invoker.invocation_count();
    let opts = MapOptions::default().with_extra_meta("call_id", json!("spoofed"));
    let err = executor.map(&square(), &[1, 2], &opts).await.unwrap_err();

    assert!(matches!(err, FanoutError::MetadataKeyCollision { ref key } if key == "call_id"));
    assert_eq!(ctx.store.put_count(), puts_before);
    assert_eq!(ctx.invoker.invocation_count(), invocations_before);
}

#[tokio::test]
async fn test_overrides_win_over_computed_fields() {
    let ctx = TestContext::new();
    let executor = ctx
        .executor()
        .with_runtime_info(RuntimeInfo::default().with_urls(["https://shard-a", "https://shard-b"]));

    let opts = MapOptions::default()
        .with_override("job_max_runtime", json!(7))
        .with_override("runtime_url", json!("https://pinned"))
        .with_override("output_key", json!("custom/output.json"));
    let futures = executor.map(&square(), &[1, 2], &opts).await.unwrap();

    for args in ctx.invoker.calls() {
        assert_eq!(args.job_max_runtime, 7);
        assert_eq!(args.runtime_url.as_deref(), Some("https://pinned"));
    }
    // Handles poll the keys that were actually sent
    assert_eq!(futures[0].output_key(), "custom/output.json");
    let recorded = futures[1].host_job_meta().invoke_args.as_ref().unwrap();
    assert_eq!(recorded.job_max_runtime, 7);
}

#[tokio::test]
async fn test_invalid_override_fails_the_call() {
    let ctx = TestContext::new();
    let opts = MapOptions::default().with_override("job_max_runtime", json!("soon"));

    let err = ctx
        .executor()
        .map(&square(), &[1], &opts)
        .await
        .unwrap_err();

    assert!(matches!(err, FanoutError::InvalidOverride { .. }));
    assert_eq!(ctx.invoker.invocation_count(), 0);
}

#[tokio::test]
async fn test_shard_chosen_per_call() {
    let ctx = TestContext::new();
    let urls = ["https://a", "https://b", "https://c"];
    let executor = ctx
        .executor()
        .with_runtime_info(RuntimeInfo::default().with_urls(urls))
        .with_shard_selector(Arc::new(RoundRobinShardSelector::default()));

    executor
        .map(&square(), &[1, 2, 3, 4, 5, 6], &MapOptions::default())
        .await
        .unwrap();

    let mut per_shard: HashMap<String, usize> = HashMap::new();
    for args in ctx.invoker.calls() {
        *per_shard.entry(args.runtime_url.unwrap()).or_default() += 1;
    }
    assert_eq!(per_shard.len(), 3);
    assert!(per_shard.values().all(|&n| n == 2));
}

#[tokio::test]
async fn test_no_shard_without_urls() {
    let ctx = TestContext::new();
    ctx.executor()
        .map(&square(), &[1, 2], &MapOptions::default())
        .await
        .unwrap();

    assert!(ctx.invoker.calls().iter().all(|args| args.runtime_url.is_none()));
}

#[tokio::test]
async fn test_module_dependency_cache() {
    let temp_dir = TempDir::new().unwrap();
    let module = temp_dir.path().join("helpers.bin");
    std::fs::write(&module, b"helper bytes").unwrap();
    let func = square().with_module(&module);

    let ctx = TestContext::new();
    let executor = ctx.executor();

    let err = executor
        .parse_module_dependencies(&func, "deps-v1", true, true)
        .await
        .unwrap_err();
    assert!(matches!(err, FanoutError::ConflictingPackageModes));

    let key = executor
        .parse_module_dependencies(&func, "deps-v1", false, true)
        .await
        .unwrap();
    assert_eq!(key, format!("{}/module_dependencies/deps-v1", TEST_PREFIX));
    let package = FunctionPackage::from_bytes(&ctx.store.get(&key).await.unwrap()).unwrap();
    assert_eq!(package.module_data.len(), 1);

    let puts_before = ctx.store.put_count();
    let shared = executor
        .parse_module_dependencies(&func, "deps-v1", true, false)
        .await
        .unwrap();
    assert_eq!(shared, key);
    assert_eq!(ctx.store.put_count(), puts_before);

    let opts = MapOptions::default().with_module_dependencies_key("deps-v1");
    executor.map(&func, &[1, 2], &opts).await.unwrap();

    assert!(ctx.invoker.calls().iter().all(|args| args.func_key == key));
    assert!(keys_ending_with(&ctx.store.keys().await, "func.json").is_empty());
}

#[tokio::test]
async fn test_excluded_modules_left_out_of_package() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("vendor")).unwrap();
    let kept = temp_dir.path().join("local.bin");
    let skipped = temp_dir.path().join("vendor").join("big.bin");
    std::fs::write(&kept, b"keep").unwrap();
    std::fs::write(&skipped, b"skip").unwrap();

    let func = RemoteFunction::registered("identity")
        .with_module(&kept)
        .with_module(&skipped);
    let ctx = TestContext::new();
    let opts = MapOptions::default().with_excluded_module("vendor");

    ctx.executor().map(&func, &[1], &opts).await.unwrap();

    let func_key = ctx.invoker.call("00000").unwrap().func_key;
    let package = FunctionPackage::from_bytes(&ctx.store.get(&func_key).await.unwrap()).unwrap();
    let paths: Vec<&String> = package.module_data.keys().collect();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with("local.bin"));
}

#[tokio::test]
async fn test_failed_call_does_not_stop_siblings() {
    let ctx = TestContext::with_invoker(|builder| builder.with_failure("00001"));

    let err = ctx
        .executor()
        .map(&square(), &[1, 2, 3], &MapOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FanoutError::Invoker(InvokerError::Rejected(_))));
    assert_eq!(ctx.invoker.invocation_count(), 3);
    assert_eq!(ctx.invoker.completion_order().len(), 2);
}

#[tokio::test]
async fn test_first_failure_in_input_order_is_reported() {
    let ctx = TestContext::with_invoker(|builder| {
        builder
            .with_failure("00001")
            .with_failure("00003")
            .with_delay("00001", Duration::from_millis(100))
    });

    let err = ctx
        .executor()
        .map(&square(), &[1, 2, 3, 4], &MapOptions::default())
        .await
        .unwrap_err();

    match err {
        FanoutError::Invoker(InvokerError::Rejected(message)) => {
            assert!(message.contains("00001"), "got {message}")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_host_metadata_recorded() {
    let ctx = TestContext::with_invoker(|builder| builder.with_config("region", json!("test-1")));
    let future = ctx
        .executor()
        .call_async(&square(), 5, &MapOptions::default())
        .await
        .unwrap();

    let meta = future.host_job_meta();
    assert_eq!(meta.backend_config.get("invoker"), Some(&json!("mock")));
    assert_eq!(meta.backend_config.get("region"), Some(&json!("test-1")));
    assert!(meta.invoke_secs.is_some());
    assert!(meta.func_upload_secs.is_some());
    assert!(meta.func_module_bytes > 0);
    assert_eq!(meta.invoke_args.as_ref().unwrap().call_id, "00000");
}
