//! Single-Slot Store Module
//!
//! A capacity-one cache: no key, no eviction policy. A new value replaces the
//! held one unless it could never fit the cost limit.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EntryStats};
use crate::clock::{Clock, SystemClock};

// == Slot Store ==
/// Holds at most one value with cost, expiry and read statistics.
pub struct SlotStore<V> {
    /// The held entry, if any
    slot: Option<CacheEntry<V>>,
    /// Maximum cost of the held entry, 0 = unlimited
    cost_limit: u64,
    /// Time source for expiry checks and read stamps
    clock: Arc<dyn Clock>,
    /// Number of values admitted so far
    admitted: u64,
    /// Performance statistics
    stats: CacheStats,
}

impl<V> SlotStore<V> {
    /// Creates an empty, unlimited slot using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: None,
            cost_limit: 0,
            clock,
            admitted: 0,
            stats: CacheStats::new(),
        }
    }

    // == Set ==
    /// Replaces the held value.
    ///
    /// Returns `false` without touching the slot when `expire_at` is not
    /// strictly in the future, or when `cost` exceeds a non-zero cost limit.
    pub fn set(&mut self, value: V, cost: u64, expire_at: Option<DateTime<Utc>>) -> bool {
        let now = self.clock.now();

        if expire_at.is_some_and(|expires| expires <= now) {
            debug!("Rejected slot set: expiration is not in the future");
            return false;
        }

        if self.cost_limit > 0 && cost > self.cost_limit {
            debug!(
                "Rejected slot set: cost {} exceeds cost limit {}",
                cost, self.cost_limit
            );
            return false;
        }

        self.slot = Some(CacheEntry::new(value, cost, expire_at, self.admitted));
        self.admitted += 1;
        true
    }

    // == Get ==
    /// Returns the held value, dropping it first if it has expired.
    pub fn get(&mut self) -> Option<V>
    where
        V: Clone,
    {
        let now = self.clock.now();

        let expired = match &self.slot {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.slot = None;
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        let entry = self.slot.as_mut()?;
        entry.record_read(now);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    /// Takes the held value out of the slot.
    pub fn remove(&mut self) -> Option<V> {
        self.slot.take().map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    // == Cost Limit ==
    /// Sets the cost limit (0 = unlimited), dropping the held value if it no
    /// longer fits.
    pub fn set_cost_limit(&mut self, limit: u64) {
        self.cost_limit = limit;

        let too_costly = self
            .slot
            .as_ref()
            .is_some_and(|entry| limit > 0 && entry.cost() > limit);
        if too_costly {
            self.slot = None;
            self.stats.record_eviction();
            debug!("Evicted slot value: cost exceeds new limit {}", limit);
        }
    }

    pub fn cost_limit(&self) -> u64 {
        self.cost_limit
    }

    // == Introspection ==
    /// Returns the current time as seen by the slot's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Returns the cost of the held value, or 0 when empty.
    pub fn total_cost(&self) -> u64 {
        self.slot.as_ref().map_or(0, CacheEntry::cost)
    }

    /// Returns the statistics of a live held value without counting a read.
    pub fn entry_stats(&self) -> Option<EntryStats> {
        let now = self.clock.now();
        self.slot
            .as_ref()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.stats)
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_totals(usize::from(self.slot.is_some()), self.total_cost());
        stats
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

impl<V> Default for SlotStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for SlotStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotStore")
            .field("occupied", &self.slot.is_some())
            .field("total_cost", &self.total_cost())
            .field("cost_limit", &self.cost_limit)
            .finish_non_exhaustive()
    }
}
