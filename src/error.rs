//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Misses, expired keys and rejected admissions are not errors; they show up
/// as `None` or as a silent no-op. Only executor failures and bad
/// configuration surface here.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The confinement worker is no longer running
    #[error("Cache worker stopped: {0}")]
    WorkerStopped(String),

    /// The dedicated runtime could not be created
    #[error("Executor error: {0}")]
    Executor(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
