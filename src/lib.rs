//! KV Cache - an in-process key-value cache
//!
//! Bounded by entry count and aggregate cost, with per-entry TTL expiration
//! and a pluggable eviction policy. All cache state is confined to a single
//! worker task; the public handles are cheap to clone and safe to share
//! across threads.
//!
//! ```ignore
//! let cache = KeyValueCache::new(ExecutorProvider::CreateNew)?;
//! cache.set_count_limit(2);
//! cache.set("a".to_string(), 1);
//! assert_eq!(cache.get("a").await?, Some(1));
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod handle;
pub mod tasks;
pub mod worker;

pub use cache::{CacheStats, CostThenReads, EntryStats, EvictionPolicy, LeastRecentlyRead};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use handle::{KeyValueCache, OneValueCache, WeakKeyValueCache};
pub use tasks::spawn_sweeper;
pub use worker::ExecutorProvider;
