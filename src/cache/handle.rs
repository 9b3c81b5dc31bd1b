//! Cache Handle Module
//!
//! Thread-safe, cloneable front end over [`CacheStore`].

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore, EstimateSize};
use crate::config::Config;
use crate::error::Result;

/// State shared by every clone of a [`Cache`].
#[derive(Debug)]
struct Shared<V> {
    /// Entry table, counters and expiry schedule, guarded as one unit
    store: RwLock<CacheStore<V>>,
    /// Wakes the expiry task when a new deadline is armed or the cache is
    /// dropped
    wakeup: Arc<Notify>,
}

impl<V> Drop for Shared<V> {
    fn drop(&mut self) {
        // Lets a sleeping expiry task observe that the cache is gone
        self.wakeup.notify_one();
    }
}

// == Cache ==
/// Concurrent cache handle.
///
/// Cloning is cheap and every clone refers to the same entries. Writes
/// (`set`, `delete`, `flush`, `set_max_memory`) take the lock exclusively;
/// reads (`get`, `exists`, `keys`) share it. Every guard is scoped to a
/// single call and never held across an await point.
///
/// Entries with a TTL are removed by the task started with
/// [`crate::tasks::spawn_expiry_task`]. Without it, expired entries are
/// treated as absent by every operation and are reaped by the next write or
/// by [`Cache::purge_expired`].
#[derive(Debug)]
pub struct Cache<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self::from_store(CacheStore::default())
    }
}

impl<V> Cache<V> {
    // == Constructors ==
    /// Creates a cache with the given memory budget in bytes.
    pub fn new(max_memory: u64) -> Self {
        Self::from_store(CacheStore::new(max_memory))
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_memory)
    }

    fn from_store(store: CacheStore<V>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: RwLock::new(store),
                wakeup: Arc::new(Notify::new()),
            }),
        }
    }

    // == Configure ==
    /// Reconfigures the memory budget from a literal such as "100KB" or "2MB".
    ///
    /// Returns the new budget in bytes. Shrinking below current usage is
    /// allowed and logged; nothing is evicted.
    pub fn set_max_memory(&self, literal: &str) -> Result<u64> {
        self.shared.store.write().set_max_memory(literal)
    }

    // == Set ==
    /// Stores a value under a new key.
    ///
    /// Fails with `CacheFull` when the estimated size exceeds the remaining
    /// budget and with `KeyAlreadyExists` when the key is present. A TTL of
    /// None or zero never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()>
    where
        V: EstimateSize,
    {
        let size = value.estimated_size();
        self.set_sized(key, value, size, ttl)
    }

    /// Stores a value using an explicit size hint instead of [`EstimateSize`].
    pub fn set_sized(
        &self,
        key: impl Into<String>,
        value: V,
        size: usize,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.shared
            .store
            .write()
            .set_sized(key.into(), value, size, ttl)?;

        if ttl.is_some_and(|ttl| !ttl.is_zero()) {
            self.shared.wakeup.notify_one();
        }
        Ok(())
    }

    // == Get ==
    /// Returns the value stored under `key`, if present and not expired.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.shared.store.read().get(key).ok()
    }

    // == Delete ==
    /// Removes `key`, cancelling its pending expiry.
    ///
    /// Returns false if the key was not present.
    pub fn delete(&self, key: &str) -> bool {
        match self.shared.store.write().delete(key) {
            Ok(_) => true,
            Err(err) => {
                warn!(key, error = %err, "no such key, delete ignored");
                false
            }
        }
    }

    // == Exists ==
    /// Checks whether `key` is present. Does not affect its TTL.
    pub fn exists(&self, key: &str) -> bool {
        self.shared.store.read().contains(key)
    }

    // == Flush ==
    /// Removes every entry, with or without TTL.
    ///
    /// Returns the number of entries removed.
    pub fn flush(&self) -> usize {
        let removed = self.shared.store.write().flush();
        debug!(removed, "cache flushed");
        removed
    }

    // == Keys ==
    /// Returns the number of entries currently held.
    pub fn keys(&self) -> usize {
        self.shared.store.read().len()
    }

    // == Introspection ==
    /// Estimated bytes held by live entries.
    pub fn used_memory(&self) -> u64 {
        self.shared.store.read().used_memory()
    }

    /// Configured memory budget in bytes.
    pub fn max_memory(&self) -> u64 {
        self.shared.store.read().max_memory()
    }

    /// Remaining TTL for `key`; None when absent or never expiring.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.shared.store.read().ttl_remaining(key)
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.shared.store.read().stats()
    }

    // == Purge Expired ==
    /// Removes every entry whose deadline has passed.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.shared.store.write().purge_expired(Instant::now())
    }

    /// Purges due entries and reports the next deadline under one write lock.
    pub(crate) fn reap(&self) -> (usize, Option<Instant>) {
        let mut store = self.shared.store.write();
        let removed = store.purge_expired(Instant::now());
        (removed, store.next_deadline())
    }

    pub(crate) fn wakeup(&self) -> Arc<Notify> {
        Arc::clone(&self.shared.wakeup)
    }

    /// Non-owning reference that does not keep the entries alive.
    pub(crate) fn downgrade(&self) -> WeakCache<V> {
        WeakCache {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

// == Weak Cache ==
/// Reference held by the expiry task; upgrading fails once every [`Cache`]
/// handle has been dropped.
pub(crate) struct WeakCache<V> {
    shared: Weak<Shared<V>>,
}

impl<V> WeakCache<V> {
    pub(crate) fn upgrade(&self) -> Option<Cache<V>> {
        self.shared.upgrade().map(|shared| Cache { shared })
    }
}
