//! Background Tasks Module
//!
//! Periodic maintenance that runs alongside a cache.
//!
//! # Tasks
//! - Expiry sweeper: purges expired entries at a fixed interval

mod sweeper;

pub use sweeper::spawn_sweeper;
