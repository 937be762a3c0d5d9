//! Eviction Policy Module
//!
//! Ranks entries for eviction. A policy compares two entries' statistics and
//! says which one should go first; the store evicts the lowest-ranked entry.

use std::cmp::Ordering;

use crate::cache::EntryStats;

// == Eviction Policy ==
/// Total order over entry statistics used to pick eviction victims.
///
/// `Ordering::Less` means `a` is evicted before `b`. Policies never see the
/// stored value, so one policy works for every value type. Equal entries are
/// broken by admission order in the store.
///
/// Any `Fn(&EntryStats, &EntryStats) -> Ordering` closure is a policy.
pub trait EvictionPolicy: Send + Sync + 'static {
    fn compare(&self, a: &EntryStats, b: &EntryStats) -> Ordering;
}

impl<F> EvictionPolicy for F
where
    F: Fn(&EntryStats, &EntryStats) -> Ordering + Send + Sync + 'static,
{
    fn compare(&self, a: &EntryStats, b: &EntryStats) -> Ordering {
        self(a, b)
    }
}

// == Cost Then Reads ==
/// Default policy: cheapest first, then least read.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostThenReads;

impl EvictionPolicy for CostThenReads {
    fn compare(&self, a: &EntryStats, b: &EntryStats) -> Ordering {
        a.cost
            .cmp(&b.cost)
            .then_with(|| a.read_count.cmp(&b.read_count))
    }
}

// == Least Recently Read ==
/// LRU-style policy: entries never read go first, then the one whose last
/// read is oldest.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastRecentlyRead;

impl EvictionPolicy for LeastRecentlyRead {
    fn compare(&self, a: &EntryStats, b: &EntryStats) -> Ordering {
        // None < Some(_), so never-read entries rank lowest
        a.last_read_at.cmp(&b.last_read_at)
    }
}
