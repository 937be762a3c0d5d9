//! Cache Module
//!
//! Synchronous cache engines: a keyed store bounded by count and cost limits
//! with pluggable eviction, and a single-slot store. Both expire entries
//! lazily.

mod entry;
mod policy;
mod slot;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, EntryStats};
pub use policy::{CostThenReads, EvictionPolicy, LeastRecentlyRead};
pub use slot::SlotStore;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Cost charged by the plain `set` operations
pub const DEFAULT_COST: u64 = 1;
