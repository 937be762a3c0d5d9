//! Handle Module
//!
//! Async, cloneable cache handles. Each handle owns a confinement worker that
//! holds the synchronous store; callers never touch the store directly.
//!
//! # Handles
//! - `KeyValueCache` - keyed cache with count/cost limits and eviction
//! - `OneValueCache` - single-slot cache with a cost limit

mod key_value;
mod one_value;

pub use key_value::{KeyValueCache, WeakKeyValueCache};
pub use one_value::OneValueCache;

use chrono::{DateTime, Utc};

/// Computes `now + ttl`. A TTL too large to represent means no expiration.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: std::time::Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
}
