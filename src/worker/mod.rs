//! Worker Module
//!
//! Confines cache state to a single worker task so that every operation on
//! one cache instance runs serially, in submission order, without blocking
//! the caller.
//!
//! # Provisioning
//! - `ExecutorProvider::CreateNew`: dedicated runtime, torn down with the cache
//! - `ExecutorProvider::Shared`: caller's runtime, left untouched

mod executor;

pub use executor::{Confined, ExecutorProvider, WeakConfined};
