//! Cache Entry Module
//!
//! Defines the structure for individual cache entries: the stored value plus
//! the read-only statistics the eviction policy ranks on.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

// == Entry Stats ==
/// Statistics tracked per entry. Policies only ever see this, never the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryStats {
    /// Admission cost charged against the cost limit
    pub cost: u64,
    /// Number of successful reads since the entry was admitted
    pub read_count: u64,
    /// Time of the most recent successful read, None = never read
    pub last_read_at: Option<DateTime<Utc>>,
    /// Expiration instant, None = no expiration
    pub expire_at: Option<DateTime<Utc>>,
}

impl EntryStats {
    /// Creates fresh statistics for a newly admitted entry.
    pub fn new(cost: u64, expire_at: Option<DateTime<Utc>>) -> Self {
        Self {
            cost,
            read_count: 0,
            last_read_at: None,
            expire_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// The entry is valid on `[admission, expire_at)`: it is expired once
    /// `now >= expire_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expire_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

// == Cache Entry ==
/// A single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Cost, expiry and read statistics
    pub stats: EntryStats,
    /// Admission sequence number, used to break eviction ties
    pub seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry with fresh read statistics.
    pub fn new(value: V, cost: u64, expire_at: Option<DateTime<Utc>>, seq: u64) -> Self {
        Self {
            value,
            stats: EntryStats::new(cost, expire_at),
            seq,
        }
    }

    /// Returns the entry cost.
    pub fn cost(&self) -> u64 {
        self.stats.cost
    }

    /// Checks if the entry has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.stats.is_expired_at(now)
    }

    // == Record Read ==
    /// Bumps the read counter and stamps the read time.
    ///
    /// `last_read_at` is strictly increasing: a read stamped at or before the
    /// previous one (same tick, or a clock that stepped back) lands one
    /// microsecond after it.
    pub fn record_read(&mut self, now: DateTime<Utc>) {
        let stamp = match self.stats.last_read_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.stats.read_count = self.stats.read_count.saturating_add(1);
        self.stats.last_read_at = Some(stamp);
    }

    // == Time To Live ==
    /// Returns remaining TTL at `now`, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::zero())` if the entry has expired
    /// - `Some(remaining)` if the entry has not expired yet
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.stats.expire_at.map(|expires| {
            if expires > now {
                expires - now
            } else {
                Duration::zero()
            }
        })
    }
}
