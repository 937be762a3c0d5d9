//! Single-Value Cache Handle
//!
//! Async front end for `SlotStore`, dispatched through its own confinement
//! worker exactly like `KeyValueCache`.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::{CacheStats, EntryStats, SlotStore, DEFAULT_COST};
use crate::error::Result;
use crate::handle::expiry_after;
use crate::worker::{Confined, ExecutorProvider};

// == One-Value Cache ==
/// Thread-safe cache holding at most one value.
pub struct OneValueCache<V> {
    worker: Confined<SlotStore<V>>,
}

impl<V> OneValueCache<V>
where
    V: Clone + Send + 'static,
{
    /// Creates an empty, unlimited slot.
    pub fn new(provider: ExecutorProvider) -> Result<Self> {
        Self::with_store(SlotStore::new(), provider)
    }

    /// Moves a prepared slot onto a new worker.
    pub fn with_store(store: SlotStore<V>, provider: ExecutorProvider) -> Result<Self> {
        Ok(Self {
            worker: Confined::spawn(store, provider)?,
        })
    }

    /// Replaces the held value with the default cost and no expiration.
    pub fn set(&self, value: V) {
        self.set_with(value, DEFAULT_COST, None);
    }

    /// Replaces the held value.
    ///
    /// Silently ignored when `expire_at` is not in the future, or when `cost`
    /// exceeds the cost limit. The held value is kept in both cases.
    pub fn set_with(&self, value: V, cost: u64, expire_at: Option<DateTime<Utc>>) {
        self.worker.execute(move |slot| {
            slot.set(value, cost, expire_at);
        });
    }

    /// Replaces the held value, expiring `ttl` after the cache processes
    /// the call.
    pub fn set_with_ttl(&self, value: V, cost: u64, ttl: Duration) {
        self.worker.execute(move |slot| {
            let expire_at = expiry_after(slot.now(), ttl);
            slot.set(value, cost, expire_at);
        });
    }

    /// Returns the held value; empty and expired slots resolve to `Ok(None)`.
    pub fn get(&self) -> impl Future<Output = Result<Option<V>>> + Send + 'static {
        self.worker.call(|slot| slot.get())
    }

    pub fn remove(&self) {
        self.worker.execute(|slot| {
            slot.remove();
        });
    }

    pub fn clear(&self) {
        self.worker.execute(SlotStore::clear);
    }

    /// Sets the cost limit (0 = unlimited), dropping a held value that no
    /// longer fits.
    pub fn set_cost_limit(&self, limit: u64) {
        self.worker.execute(move |slot| slot.set_cost_limit(limit));
    }

    pub fn cost_limit(&self) -> impl Future<Output = Result<u64>> + Send + 'static {
        self.worker.call(|slot| slot.cost_limit())
    }

    pub fn total_cost(&self) -> impl Future<Output = Result<u64>> + Send + 'static {
        self.worker.call(|slot| slot.total_cost())
    }

    /// Statistics of the held value. Does not count as a read.
    pub fn entry_stats(&self) -> impl Future<Output = Result<Option<EntryStats>>> + Send + 'static {
        self.worker.call(|slot| slot.entry_stats())
    }

    pub fn stats(&self) -> impl Future<Output = Result<CacheStats>> + Send + 'static {
        self.worker.call(|slot| slot.stats())
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Waits for every previously issued operation to finish, then releases
    /// this handle.
    pub async fn shutdown(self) -> Result<()> {
        self.worker.call(|_| ()).await
    }
}

impl<V> Clone for OneValueCache<V> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker.clone(),
        }
    }
}

impl<V> std::fmt::Debug for OneValueCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneValueCache")
            .field("worker", &self.worker)
            .finish()
    }
}
