//! Integration Tests for the Cache Handles
//!
//! Drives `KeyValueCache` and `OneValueCache` through the public async API,
//! on both a shared runtime and a dedicated worker runtime.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use kv_cache::cache::CacheStore;
use kv_cache::cache::SlotStore;
use kv_cache::{
    spawn_sweeper, CacheConfig, CacheError, Clock, CostThenReads, EntryStats, ExecutorProvider,
    KeyValueCache, LeastRecentlyRead, ManualClock, OneValueCache,
};
use tokio::runtime::Handle;

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn shared() -> ExecutorProvider {
    ExecutorProvider::Shared(Handle::current())
}

fn cache_with_clock() -> (KeyValueCache<String, String>, ManualClock) {
    init_tracing();
    let clock = ManualClock::default();
    let store = CacheStore::with_parts(Box::new(CostThenReads), Arc::new(clock.clone()));
    (KeyValueCache::with_store(store, shared()).unwrap(), clock)
}

// == Round Trip ==

#[tokio::test]
async fn test_set_then_get_returns_value() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();

    for i in 0..50u32 {
        cache.set(format!("key{}", i), i);
    }
    for i in 0..50u32 {
        assert_eq!(cache.get(&format!("key{}", i)).await.unwrap(), Some(i));
    }
}

#[test]
fn test_dedicated_runtime_round_trip() {
    init_tracing();
    let cache = KeyValueCache::new(ExecutorProvider::CreateNew).unwrap();

    cache.set("AAAAAA".to_string(), "BBBBBB".to_string());
    let value = tokio_test::block_on(cache.get("AAAAAA")).unwrap();
    assert_eq!(value, Some("BBBBBB".to_string()));
}

#[test]
fn test_dedicated_runtime_shared_across_threads() {
    init_tracing();
    let cache: KeyValueCache<u32, u32> = KeyValueCache::new(ExecutorProvider::CreateNew).unwrap();

    let writers: Vec<_> = (0..4u32)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    cache.set_with(t * 100 + i, i, 2, None);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(tokio_test::block_on(cache.len()).unwrap(), 100);
    assert_eq!(tokio_test::block_on(cache.total_cost()).unwrap(), 200);
}

// == TTL ==

#[tokio::test]
async fn test_ttl_boundary() {
    let (cache, clock) = cache_with_clock();
    let start = clock.now();

    cache.set_with(
        "k".to_string(),
        "v".to_string(),
        1,
        Some(start + ChronoDuration::seconds(3)),
    );

    clock.set(start + ChronoDuration::milliseconds(2900));
    assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));

    clock.set(start + ChronoDuration::milliseconds(3100));
    assert_eq!(cache.get("k").await.unwrap(), None);
    assert_eq!(cache.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_set_with_past_expiry_is_noop() {
    let (cache, clock) = cache_with_clock();
    cache.set("k".to_string(), "old".to_string());
    cache.set_with("k".to_string(), "new".to_string(), 1, Some(clock.now()));

    assert_eq!(cache.get("k").await.unwrap(), Some("old".to_string()));
}

// == Count Limit ==

#[tokio::test]
async fn test_count_limit_evicts_lowest_ranked() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();
    cache.set_count_limit(2);

    cache.set("A".to_string(), 1);
    cache.set("B".to_string(), 2);
    cache.set("C".to_string(), 3);

    assert_eq!(cache.len().await.unwrap(), 2);
    // equal cost and reads: earliest admission goes first
    assert_eq!(cache.get("A").await.unwrap(), None);
    assert_eq!(cache.get("B").await.unwrap(), Some(2));
    assert_eq!(cache.get("C").await.unwrap(), Some(3));
    assert_eq!(cache.stats().await.unwrap().evictions, 1);
}

#[tokio::test]
async fn test_reads_protect_from_eviction() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();
    cache.set_count_limit(2);

    cache.set("A".to_string(), 1);
    cache.set("B".to_string(), 2);
    cache.get("A").await.unwrap();
    cache.set("C".to_string(), 3);

    assert_eq!(cache.get("A").await.unwrap(), Some(1));
    assert_eq!(cache.get("B").await.unwrap(), None);
}

#[tokio::test]
async fn test_limit_shrink_evicts_immediately() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();
    for key in ["a", "b", "c"] {
        cache.set(key.to_string(), key.len());
    }
    assert_eq!(cache.len().await.unwrap(), 3);

    cache.set_count_limit(1);
    assert_eq!(cache.len().await.unwrap(), 1);
}

// == Cost Limit ==

#[tokio::test]
async fn test_cost_limit_holds_at_every_step() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();
    cache.set_cost_limit(100);

    let mut expected_total = Vec::new();
    for (i, cost) in [20u64, 50, 50].into_iter().enumerate() {
        cache.set_with(i, cost, cost, None);
        let total = cache.total_cost().await.unwrap();
        assert!(total <= 100, "aggregate cost {} exceeds limit", total);
        expected_total.push(total);
    }

    let mut true_sum = 0;
    for i in 0..3usize {
        if let Some(stats) = cache.entry_stats(&i).await.unwrap() {
            true_sum += stats.cost;
        }
    }
    assert_eq!(cache.total_cost().await.unwrap(), true_sum);
    assert_eq!(expected_total, vec![20, 70, 100]);
}

#[tokio::test]
async fn test_oversized_entry_is_rejected() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();
    cache.set_cost_limit(100);
    cache.set_with("small".to_string(), (), 10, None);
    cache.set_with("huge".to_string(), (), 101, None);

    assert_eq!(cache.get("huge").await.unwrap(), None);
    assert_eq!(cache.get("small").await.unwrap(), Some(()));
    assert_eq!(cache.total_cost().await.unwrap(), 10);
}

#[tokio::test]
async fn test_replacement_delta() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();
    cache.set_with("other".to_string(), "x", 5, None);
    cache.set_with("k".to_string(), "v1", 20, None);
    let before = cache.total_cost().await.unwrap();

    cache.set_with("k".to_string(), "v2", 200, None);
    let after = cache.total_cost().await.unwrap();

    assert_eq!(after - before, 180);
    assert_eq!(cache.get("k").await.unwrap(), Some("v2"));
}

// == Remove ==

#[tokio::test]
async fn test_remove_missing_is_noop() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();
    cache.set_with("k".to_string(), 1u8, 7, None);

    cache.remove("missing");
    assert_eq!(cache.len().await.unwrap(), 1);
    assert_eq!(cache.total_cost().await.unwrap(), 7);

    cache.remove("k");
    cache.remove("k");
    assert_eq!(cache.len().await.unwrap(), 0);
    assert_eq!(cache.total_cost().await.unwrap(), 0);
}

// == Policies ==

#[tokio::test]
async fn test_custom_closure_policy() {
    init_tracing();
    // evict the most expensive entry first
    let policy = |a: &EntryStats, b: &EntryStats| b.cost.cmp(&a.cost);
    let cache = KeyValueCache::with_policy(shared(), policy).unwrap();
    cache.set_count_limit(2);

    cache.set_with("cheap".to_string(), 1, 1, None);
    cache.set_with("dear".to_string(), 2, 50, None);
    cache.set_with("mid".to_string(), 3, 10, None);

    assert_eq!(cache.get("dear").await.unwrap(), None);
    assert_eq!(cache.total_cost().await.unwrap(), 11);
}

#[tokio::test]
async fn test_least_recently_read_policy() {
    init_tracing();
    let clock = ManualClock::default();
    let store = CacheStore::with_parts(Box::new(LeastRecentlyRead), Arc::new(clock.clone()));
    let cache = KeyValueCache::with_store(store, shared()).unwrap();

    for key in ["a", "b", "c"] {
        cache.set(key.to_string(), key.to_string());
    }
    for key in ["a", "b", "c"] {
        clock.advance(ChronoDuration::seconds(1));
        cache.get(key).await.unwrap();
    }
    clock.advance(ChronoDuration::seconds(1));
    cache.get("a").await.unwrap();

    cache.set_count_limit(2);
    assert_eq!(cache.get("b").await.unwrap(), None);
    assert_eq!(cache.get("a").await.unwrap(), Some("a".to_string()));
}

// == Config and Sweeper ==

#[tokio::test]
async fn test_config_driven_cache_with_sweeper() {
    init_tracing();
    let config = CacheConfig {
        count_limit: 10,
        cost_limit: 0,
        sweep_interval: 1,
    };
    let cache: KeyValueCache<String, u32> = KeyValueCache::from_config(&config, shared()).unwrap();
    cache.set_with_ttl("brief".to_string(), 1, 1, Duration::from_millis(200));
    cache.set("lasting".to_string(), 2);

    let interval = config.sweep_interval().unwrap();
    let sweeper = spawn_sweeper(&cache, interval);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(cache.len().await.unwrap(), 1);
    assert_eq!(cache.get("lasting").await.unwrap(), Some(2));
    sweeper.abort();
}

#[tokio::test]
async fn test_sweeper_does_not_outlive_dedicated_cache() {
    init_tracing();
    let cache: KeyValueCache<String, u32> = KeyValueCache::new(ExecutorProvider::CreateNew).unwrap();
    cache.set_with_ttl("brief".to_string(), 1, 1, Duration::from_millis(5));
    let sweeper = spawn_sweeper(&cache, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(50)).await;

    drop(cache);
    let joined = tokio::time::timeout(Duration::from_secs(5), sweeper).await;
    assert!(matches!(joined, Ok(Ok(()))), "sweeper kept running after the cache was dropped");
}

// == Lifecycle ==

#[test]
fn test_stopped_cache_reports_error() {
    init_tracing();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let cache: KeyValueCache<String, String> =
        KeyValueCache::new(ExecutorProvider::Shared(runtime.handle().clone())).unwrap();
    runtime.shutdown_timeout(Duration::from_secs(1));

    assert!(!cache.is_running());
    cache.set("ignored".to_string(), "value".to_string());
    let result = tokio_test::block_on(cache.get("ignored"));
    assert!(matches!(result, Err(CacheError::WorkerStopped(_))));
}

#[tokio::test]
async fn test_shutdown_flushes_pending_writes() {
    init_tracing();
    let cache = KeyValueCache::new(shared()).unwrap();
    let reader = cache.clone();
    for i in 0..10i32 {
        cache.set(i, i * 2);
    }
    cache.shutdown().await.unwrap();

    assert_eq!(reader.get(&9i32).await.unwrap(), Some(18));
}

// == One-Value Cache ==

#[tokio::test]
async fn test_one_value_cache_expiry() {
    init_tracing();
    let clock = ManualClock::default();
    let slot = SlotStore::with_clock(Arc::new(clock.clone()));
    let cache = OneValueCache::with_store(slot, shared()).unwrap();
    let start = clock.now();

    cache.set_with("AAAAAA".to_string(), 1, Some(start + ChronoDuration::seconds(3)));

    clock.set(start + ChronoDuration::milliseconds(2900));
    assert_eq!(cache.get().await.unwrap(), Some("AAAAAA".to_string()));

    clock.set(start + ChronoDuration::milliseconds(3100));
    assert_eq!(cache.get().await.unwrap(), None);
    assert_eq!(cache.total_cost().await.unwrap(), 0);
}

#[test]
fn test_one_value_cache_dedicated_runtime() {
    init_tracing();
    let cache = OneValueCache::new(ExecutorProvider::CreateNew).unwrap();
    cache.set_cost_limit(10);
    cache.set_with(1u64, 10, None);
    cache.set_with(2u64, 20, None);

    assert_eq!(tokio_test::block_on(cache.get()).unwrap(), Some(1));
}
