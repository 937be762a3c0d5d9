//! Expiry Sweeper
//!
//! Background task that periodically purges expired entries from a
//! `KeyValueCache`.

use std::hash::Hash;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::handle::KeyValueCache;

/// Spawns a task on the current runtime that purges expired entries every
/// `interval`.
///
/// The sweep runs through the cache's worker like any other operation, so it
/// never races a caller. The task holds only a weak reference: it ends on its
/// own once every cache handle is dropped or the worker has stopped, and it
/// never keeps a dedicated worker runtime alive. It can also be aborted
/// through the returned handle.
///
/// # Panics
/// Panics if called outside a tokio runtime.
pub fn spawn_sweeper<K, V>(cache: &KeyValueCache<K, V>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let cache = cache.downgrade();

    tokio::spawn(async move {
        info!("Starting expiry sweeper with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let Some(strong) = cache.upgrade() else {
                info!("Expiry sweeper stopping: cache dropped");
                break;
            };
            // queued eagerly; the strong handle must not outlive the tick
            let purge = strong.purge_expired();
            drop(strong);

            match purge.await {
                Ok(0) => debug!("Expiry sweep: no expired entries found"),
                Ok(removed) => info!("Expiry sweep: removed {} expired entries", removed),
                Err(e) => {
                    warn!("Expiry sweeper stopping: {}", e);
                    break;
                }
            }
        }
    })
}
