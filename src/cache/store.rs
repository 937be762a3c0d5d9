//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with policy-driven eviction,
//! lazy TTL expiration and aggregate cost tracking.
//!
//! The store is synchronous and single-owner. Concurrent callers go through
//! the confinement worker in `crate::worker`, which owns one store and runs
//! every operation on it in submission order.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, CostThenReads, EntryStats, EvictionPolicy};
use crate::clock::{Clock, SystemClock};

// == Cache Store ==
/// Key-value storage bounded by an entry count limit and a cost limit.
///
/// Both limits default to 0, which means unlimited. `total_cost` always
/// equals the sum of the costs of the entries in the map.
pub struct CacheStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// Sum of the costs of all entries
    total_cost: u64,
    /// Maximum number of entries, 0 = unlimited
    count_limit: usize,
    /// Maximum aggregate cost, 0 = unlimited
    cost_limit: u64,
    /// Ranks eviction victims
    policy: Box<dyn EvictionPolicy>,
    /// Time source for expiry checks and read stamps
    clock: Arc<dyn Clock>,
    /// Next admission sequence number
    next_seq: u64,
    /// Performance statistics
    stats: CacheStats,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an unlimited store with the default policy and system clock.
    pub fn new() -> Self {
        Self::with_parts(Box::new(CostThenReads), Arc::new(SystemClock))
    }

    /// Creates an unlimited store ranking victims with `policy`.
    pub fn with_policy(policy: impl EvictionPolicy) -> Self {
        Self::with_parts(Box::new(policy), Arc::new(SystemClock))
    }

    /// Creates an unlimited store from an explicit policy and clock.
    pub fn with_parts(policy: Box<dyn EvictionPolicy>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            total_cost: 0,
            count_limit: 0,
            cost_limit: 0,
            policy,
            clock,
            next_seq: 0,
            stats: CacheStats::new(),
        }
    }

    // == Set ==
    /// Stores a key-value pair with a cost and optional expiration instant.
    ///
    /// Returns `false` without touching the store when `expire_at` is not
    /// strictly in the future, or when `cost` alone exceeds a non-zero cost
    /// limit. Otherwise expired entries are purged, victims are evicted until
    /// the new entry fits both limits, and the entry is inserted with fresh
    /// read statistics. Replacing a key counts its old cost out first.
    ///
    /// With no cost limit, a cost that would overflow the `u64` aggregate is
    /// also rejected, after the expiry sweep and without evicting anything.
    pub fn set(&mut self, key: K, value: V, cost: u64, expire_at: Option<DateTime<Utc>>) -> bool {
        let now = self.clock.now();

        if let Some(expires) = expire_at {
            if expires <= now {
                debug!("Rejected set: expiration is not in the future");
                return false;
            }
        }

        if self.cost_limit > 0 && cost > self.cost_limit {
            debug!(
                "Rejected set: cost {} exceeds cost limit {}",
                cost, self.cost_limit
            );
            return false;
        }

        self.purge_expired_at(now);

        if self.cost_limit == 0 && self.projected_cost(&key, cost).is_none() {
            debug!("Rejected set: cost {} overflows the aggregate cost", cost);
            return false;
        }

        if !self.make_room_for(&key, cost) {
            debug!("Rejected set: no room for cost {}", cost);
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = CacheEntry::new(value, cost, expire_at, seq);
        if let Some(old) = self.entries.insert(key, entry) {
            self.total_cost -= old.cost();
        }
        self.total_cost += cost;

        true
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// An expired entry is removed and reported as a miss. A hit bumps the
    /// entry's read count and read timestamp, which the policy may rank on.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.take(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            debug!("Expired entry removed on read");
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.record_read(now);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    // == Remove ==
    /// Removes an entry by key, returning its value. A miss is a no-op.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(key).map(|entry| entry.value)
    }

    // == Clear ==
    /// Removes every entry and resets the aggregate cost.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_cost = 0;
    }

    // == Limits ==
    /// Sets the entry count limit (0 = unlimited).
    ///
    /// Lowering the limit below the current entry count evicts immediately.
    pub fn set_count_limit(&mut self, limit: usize) {
        self.count_limit = limit;
        self.purge_expired();
        self.enforce_limits();
    }

    /// Sets the aggregate cost limit (0 = unlimited).
    ///
    /// Lowering the limit below the current aggregate cost evicts immediately.
    pub fn set_cost_limit(&mut self, limit: u64) {
        self.cost_limit = limit;
        self.purge_expired();
        self.enforce_limits();
    }

    pub fn count_limit(&self) -> usize {
        self.count_limit
    }

    pub fn cost_limit(&self) -> u64 {
        self.cost_limit
    }

    // == Purge Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        self.purge_expired_at(now)
    }

    fn purge_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        let mut removed_cost = 0;

        self.entries.retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                removed_cost += entry.cost();
                false
            } else {
                true
            }
        });

        self.total_cost -= removed_cost;
        self.stats.record_expirations(removed);

        if removed > 0 {
            debug!(
                "Expiry sweep: removed {} entries, cost {}",
                removed, removed_cost
            );
        }
        removed
    }

    // == Eviction ==
    /// Evicts victims until an entry of `cost` under `key` fits both limits.
    ///
    /// `key` itself is never picked: when it is present it is about to be
    /// replaced, and its old cost is already counted out of the projection.
    ///
    /// Returns `false` if the entry still does not fit once nothing else is
    /// left to evict.
    fn make_room_for(&mut self, key: &K, cost: u64) -> bool {
        loop {
            let count = self.entries.len() + usize::from(!self.entries.contains_key(key));
            let fits = self
                .projected_cost(key, cost)
                .is_some_and(|projected| !self.exceeds(count, projected));

            if fits {
                return true;
            }
            if !self.evict_one(Some(key)) {
                return false;
            }
        }
    }

    /// Aggregate cost after storing `cost` under `key`, or `None` on overflow.
    fn projected_cost(&self, key: &K, cost: u64) -> Option<u64> {
        let existing = self.entries.get(key).map_or(0, CacheEntry::cost);
        (self.total_cost - existing).checked_add(cost)
    }

    /// Evicts victims until the current contents fit both limits.
    fn enforce_limits(&mut self) {
        while self.exceeds(self.entries.len(), self.total_cost) {
            if !self.evict_one(None) {
                break;
            }
        }
    }

    fn exceeds(&self, count: usize, cost: u64) -> bool {
        (self.count_limit > 0 && count > self.count_limit)
            || (self.cost_limit > 0 && cost > self.cost_limit)
    }

    /// Removes the lowest-ranked entry other than `protected`.
    ///
    /// Returns `false` when there is nothing left to evict.
    fn evict_one(&mut self, protected: Option<&K>) -> bool {
        let Some(victim) = self.select_victim(protected) else {
            return false;
        };

        if let Some(entry) = self.take(&victim) {
            self.stats.record_eviction();
            debug!(
                "Evicted entry: cost {}, reads {}",
                entry.cost(),
                entry.stats.read_count
            );
        }
        true
    }

    /// Ranks the whole live set with the policy and returns the lowest key.
    ///
    /// Ties go to the earliest admission, so the choice depends only on the
    /// map contents and never on HashMap iteration order.
    fn select_victim(&self, protected: Option<&K>) -> Option<K> {
        self.entries
            .iter()
            .filter(|(key, _)| protected != Some(*key))
            .min_by(|(_, a), (_, b)| {
                self.policy
                    .compare(&a.stats, &b.stats)
                    .then_with(|| a.seq.cmp(&b.seq))
            })
            .map(|(key, _)| key.clone())
    }

    /// Removes an entry and counts its cost out of the aggregate.
    fn take<Q>(&mut self, key: &Q) -> Option<CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.entries.remove(key)?;
        self.total_cost -= entry.cost();
        Some(entry)
    }

    // == Introspection ==
    /// Returns the current time as seen by the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Returns the statistics of a live entry without counting a read.
    pub fn entry_stats<Q>(&self, key: &Q) -> Option<EntryStats>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.stats)
    }

    /// Returns the aggregate cost of all entries.
    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_totals(self.entries.len(), self.total_cost);
        stats
    }

    /// Returns the current number of entries in the cache.
    ///
    /// Expired entries still count until a read or sweep removes them.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sums entry costs from scratch, for checking `total_cost` against.
    #[cfg(test)]
    pub(crate) fn true_cost(&self) -> u64 {
        self.entries.values().map(CacheEntry::cost).sum()
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }
}

impl<K, V> Default for CacheStore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for CacheStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.entries.len())
            .field("total_cost", &self.total_cost)
            .field("count_limit", &self.count_limit)
            .field("cost_limit", &self.cost_limit)
            .finish_non_exhaustive()
    }
}
