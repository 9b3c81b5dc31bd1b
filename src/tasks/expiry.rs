//! TTL Expiry Task
//!
//! Background task that removes cache entries as their deadlines elapse.

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::cache::Cache;

/// Spawns the task that drives the cache's expiry schedule.
///
/// A single task serves every TTL entry of the cache. It sleeps until the
/// earliest deadline, removes every due entry under one write lock, and is
/// woken early whenever a new deadline is armed. Removal goes through the
/// same path as an explicit delete, so a racing delete simply wins or finds
/// nothing to do.
///
/// The task only holds a weak reference between passes: once every
/// [`Cache`] handle has been dropped it exits on its own. Aborting the
/// returned handle stops it earlier.
///
/// Must be called from within a tokio runtime.
///
/// # Returns
/// A JoinHandle for the spawned task.
///
/// # Example
/// ```ignore
/// let cache: Cache<String> = Cache::default();
/// let expiry_handle = spawn_expiry_task(cache.clone());
/// // Later, during shutdown:
/// expiry_handle.abort();
/// ```
pub fn spawn_expiry_task<V>(cache: Cache<V>) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
{
    let wakeup = cache.wakeup();
    let weak = cache.downgrade();
    drop(cache);

    tokio::spawn(async move {
        info!("Starting TTL expiry task");

        loop {
            let Some(cache) = weak.upgrade() else {
                info!("Cache dropped, stopping TTL expiry task");
                break;
            };
            let (removed, next_deadline) = cache.reap();
            drop(cache);

            if removed > 0 {
                info!(removed, "TTL expiry: removed expired entries");
            }

            match next_deadline {
                Some(deadline) => {
                    let deadline = Instant::from_std(deadline);
                    debug!(
                        wait = ?deadline.saturating_duration_since(Instant::now()),
                        "TTL expiry: sleeping until next deadline"
                    );
                    tokio::select! {
                        _ = sleep_until(deadline) => {}
                        _ = wakeup.notified() => {}
                    }
                }
                None => wakeup.notified().await,
            }
        }
    })
}
