//! Configuration Module
//!
//! Loads cache limits and the sweep interval from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

pub const COUNT_LIMIT_VAR: &str = "KV_CACHE_COUNT_LIMIT";
pub const COST_LIMIT_VAR: &str = "KV_CACHE_COST_LIMIT";
pub const SWEEP_INTERVAL_VAR: &str = "KV_CACHE_SWEEP_INTERVAL";

/// Cache configuration parameters.
///
/// A zero in any field means "unlimited" / "disabled", matching the cache's
/// own limit semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries, 0 = unlimited
    pub count_limit: usize,
    /// Maximum aggregate cost, 0 = unlimited
    pub cost_limit: u64,
    /// Background sweep interval in seconds, 0 = no sweeper
    pub sweep_interval: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig from environment variables.
    ///
    /// Missing or unparsable values fall back to the default of 0.
    ///
    /// # Environment Variables
    /// - `KV_CACHE_COUNT_LIMIT` - Maximum entry count (default: 0)
    /// - `KV_CACHE_COST_LIMIT` - Maximum aggregate cost (default: 0)
    /// - `KV_CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 0)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like `from_env`, but rejects values that are set and do not parse.
    pub fn try_from_env() -> Result<Self> {
        Self::try_from_lookup(|name| env::var(name).ok())
    }

    /// Returns the sweep interval, or `None` when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            count_limit: lookup(COUNT_LIMIT_VAR)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            cost_limit: lookup(COST_LIMIT_VAR)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            sweep_interval: lookup(SWEEP_INTERVAL_VAR)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        }
    }

    fn try_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            count_limit: parse_var(&lookup, COUNT_LIMIT_VAR)?,
            cost_limit: parse_var(&lookup, COST_LIMIT_VAR)?,
            sweep_interval: parse_var(&lookup, SWEEP_INTERVAL_VAR)?,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<T>
where
    T: FromStr + Default,
{
    match lookup(name) {
        None => Ok(T::default()),
        Some(raw) => raw.trim().parse().map_err(|_| {
            CacheError::InvalidConfig(format!("{} must be a non-negative integer, got {:?}", name, raw))
        }),
    }
}
