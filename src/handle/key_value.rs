//! Key-Value Cache Handle
//!
//! Async front end for `CacheStore`. Every call is dispatched to the cache's
//! confinement worker; writes return immediately, reads return a future.

use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::{CacheStats, CacheStore, EntryStats, EvictionPolicy, DEFAULT_COST};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::handle::expiry_after;
use crate::worker::{Confined, ExecutorProvider, WeakConfined};

// == Key-Value Cache ==
/// Thread-safe, bounded key-value cache with TTL expiration.
///
/// Cloning the handle shares the same cache. Operations issued through any
/// clone run one at a time, in the order they were issued.
///
/// # Side effects
/// - `get` is not read-only: a hit updates the entry's read statistics,
///   which the eviction policy may rank on.
/// - `set_count_limit` / `set_cost_limit` evict immediately when the new
///   bound is below the current contents.
pub struct KeyValueCache<K, V> {
    worker: Confined<CacheStore<K, V>>,
}

impl<K, V> KeyValueCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructors ==
    /// Creates an unlimited cache with the default eviction policy.
    pub fn new(provider: ExecutorProvider) -> Result<Self> {
        Self::with_store(CacheStore::new(), provider)
    }

    /// Creates an unlimited cache ranking eviction victims with `policy`.
    pub fn with_policy(provider: ExecutorProvider, policy: impl EvictionPolicy) -> Result<Self> {
        Self::with_store(CacheStore::with_policy(policy), provider)
    }

    /// Creates a cache with the limits from `config`.
    pub fn from_config(config: &CacheConfig, provider: ExecutorProvider) -> Result<Self> {
        let mut store = CacheStore::new();
        store.set_count_limit(config.count_limit);
        store.set_cost_limit(config.cost_limit);
        Self::with_store(store, provider)
    }

    /// Moves a prepared store onto a new worker.
    pub fn with_store(store: CacheStore<K, V>, provider: ExecutorProvider) -> Result<Self> {
        debug!(
            "Creating key-value cache: count_limit={}, cost_limit={}",
            store.count_limit(),
            store.cost_limit()
        );
        Ok(Self {
            worker: Confined::spawn(store, provider)?,
        })
    }

    // == Set ==
    /// Stores `value` under `key` with the default cost and no expiration.
    pub fn set(&self, key: K, value: V) {
        self.set_with(key, value, DEFAULT_COST, None);
    }

    /// Stores `value` under `key` with an explicit cost and expiration.
    ///
    /// Silently ignored when `expire_at` is not in the future, or when `cost`
    /// alone exceeds the cost limit.
    pub fn set_with(&self, key: K, value: V, cost: u64, expire_at: Option<DateTime<Utc>>) {
        self.worker.execute(move |store| {
            store.set(key, value, cost, expire_at);
        });
    }

    /// Stores `value` under `key`, expiring `ttl` after the cache processes
    /// the call.
    pub fn set_with_ttl(&self, key: K, value: V, cost: u64, ttl: Duration) {
        self.worker.execute(move |store| {
            let expire_at = expiry_after(store.now(), ttl);
            store.set(key, value, cost, expire_at);
        });
    }

    // == Get ==
    /// Looks up `key`. Missing and expired keys resolve to `Ok(None)`.
    pub fn get<Q>(&self, key: &Q) -> impl Future<Output = Result<Option<V>>> + Send + 'static
    where
        Q: ToOwned<Owned = K> + ?Sized,
    {
        let key = key.to_owned();
        self.worker.call(move |store| store.get(&key))
    }

    // == Remove / Clear ==
    /// Removes `key` if present.
    pub fn remove<Q>(&self, key: &Q)
    where
        Q: ToOwned<Owned = K> + ?Sized,
    {
        let key = key.to_owned();
        self.worker.execute(move |store| {
            store.remove(&key);
        });
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.worker.execute(CacheStore::clear);
    }

    /// Removes every expired entry, resolving to the number removed.
    ///
    /// The sweep is queued immediately; awaiting the result is optional.
    pub fn purge_expired(&self) -> impl Future<Output = Result<usize>> + Send + 'static {
        self.worker.call(CacheStore::purge_expired)
    }

    // == Limits ==
    /// Sets the entry count limit (0 = unlimited), evicting down to it.
    pub fn set_count_limit(&self, limit: usize) {
        self.worker.execute(move |store| store.set_count_limit(limit));
    }

    /// Sets the aggregate cost limit (0 = unlimited), evicting down to it.
    pub fn set_cost_limit(&self, limit: u64) {
        self.worker.execute(move |store| store.set_cost_limit(limit));
    }

    pub fn count_limit(&self) -> impl Future<Output = Result<usize>> + Send + 'static {
        self.worker.call(|store| store.count_limit())
    }

    pub fn cost_limit(&self) -> impl Future<Output = Result<u64>> + Send + 'static {
        self.worker.call(|store| store.cost_limit())
    }

    // == Introspection ==
    /// Number of entries held, expired ones included until swept.
    pub fn len(&self) -> impl Future<Output = Result<usize>> + Send + 'static {
        self.worker.call(|store| store.len())
    }

    pub fn is_empty(&self) -> impl Future<Output = Result<bool>> + Send + 'static {
        self.worker.call(|store| store.is_empty())
    }

    /// Aggregate cost of the held entries.
    pub fn total_cost(&self) -> impl Future<Output = Result<u64>> + Send + 'static {
        self.worker.call(|store| store.total_cost())
    }

    /// Statistics of a live entry. Does not count as a read.
    pub fn entry_stats<Q>(
        &self,
        key: &Q,
    ) -> impl Future<Output = Result<Option<EntryStats>>> + Send + 'static
    where
        Q: ToOwned<Owned = K> + ?Sized,
    {
        let key = key.to_owned();
        self.worker.call(move |store| store.entry_stats(&key))
    }

    pub fn stats(&self) -> impl Future<Output = Result<CacheStats>> + Send + 'static {
        self.worker.call(|store| store.stats())
    }

    // == Lifecycle ==
    /// Returns `false` once the worker has stopped.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Waits for every previously issued operation to finish, then releases
    /// this handle. The worker stops once no other clone remains.
    pub async fn shutdown(self) -> Result<()> {
        self.worker.call(|_| ()).await
    }

    /// Returns a handle that does not keep the cache alive.
    pub fn downgrade(&self) -> WeakKeyValueCache<K, V> {
        WeakKeyValueCache {
            worker: self.worker.downgrade(),
        }
    }
}

// == Weak Key-Value Cache ==
/// Non-owning reference to a `KeyValueCache`, for background tasks that
/// should end with the cache rather than extend its life.
pub struct WeakKeyValueCache<K, V> {
    worker: WeakConfined<CacheStore<K, V>>,
}

impl<K, V> WeakKeyValueCache<K, V> {
    /// Returns the cache, or `None` once every strong handle is dropped.
    pub fn upgrade(&self) -> Option<KeyValueCache<K, V>> {
        self.worker
            .upgrade()
            .map(|worker| KeyValueCache { worker })
    }
}

impl<K, V> Clone for WeakKeyValueCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker.clone(),
        }
    }
}

impl<K, V> std::fmt::Debug for WeakKeyValueCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakKeyValueCache")
            .field("worker", &self.worker)
            .finish()
    }
}

impl<K, V> Clone for KeyValueCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker.clone(),
        }
    }
}

impl<K, V> std::fmt::Debug for KeyValueCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueCache")
            .field("worker", &self.worker)
            .finish()
    }
}
