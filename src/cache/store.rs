//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with memory accounting and a
//! TTL expiry schedule. The store itself is unlocked; [`crate::cache::Cache`]
//! wraps it in a reader/writer lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cache::{
    parse_size_literal, CacheEntry, CacheStats, EstimateSize, ExpiryQueue, StatCounters,
    DEFAULT_MAX_MEMORY,
};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Cache storage with a soft memory budget and TTL support.
///
/// `used_memory` always equals the sum of `size` over stored entries. Every
/// removal path (delete, expiry, flush) goes through the same bookkeeping.
///
/// An entry past its deadline is absent for every operation, whether or not
/// it has been purged yet: mutators purge due entries before acting, and the
/// read-only counters leave them out.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Pending deadlines for TTL entries
    expiry: ExpiryQueue,
    /// Performance statistics
    counters: StatCounters,
    /// Memory budget in bytes
    max_memory: u64,
    /// Estimated bytes held by live entries
    used_memory: u64,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with the given memory budget in bytes.
    pub fn new(max_memory: u64) -> Self {
        Self {
            entries: HashMap::new(),
            expiry: ExpiryQueue::new(),
            counters: StatCounters::default(),
            max_memory,
            used_memory: 0,
        }
    }

    // == Set Max Memory ==
    /// Reconfigures the memory budget from a size literal such as "100KB".
    ///
    /// On a parse failure the budget is left unchanged. A budget below the
    /// current usage is applied anyway; nothing is evicted, so new inserts
    /// are refused until enough entries are removed.
    pub fn set_max_memory(&mut self, literal: &str) -> Result<u64> {
        self.purge_expired(Instant::now());

        let max_memory = parse_size_literal(literal).inspect_err(|err| {
            warn!(literal, error = %err, "rejected max memory literal");
        })?;

        if max_memory < self.used_memory {
            warn!(
                max_memory,
                used_memory = self.used_memory,
                "new max memory is below current usage"
            );
        }

        info!(previous = self.max_memory, max_memory, "max memory updated");
        self.max_memory = max_memory;
        Ok(max_memory)
    }

    // == Set ==
    /// Stores a value, estimating its size with [`EstimateSize`].
    ///
    /// See [`CacheStore::set_sized`] for admission rules.
    pub fn set(&mut self, key: String, value: V, ttl: Option<Duration>) -> Result<()>
    where
        V: EstimateSize,
    {
        let size = value.estimated_size();
        self.set_sized(key, value, size, ttl)
    }

    /// Stores a value with a caller-provided size estimate.
    ///
    /// The insert is rejected, leaving the store untouched, when the size
    /// exceeds the remaining budget or when the key already exists. Existing
    /// keys are never overwritten; delete them first.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `size` - Estimated size of the value in bytes
    /// * `ttl` - Optional time-to-live; None or zero never expires
    pub fn set_sized(
        &mut self,
        key: String,
        value: V,
        size: usize,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.purge_expired(Instant::now());

        let size = size as u64;
        let available = self.max_memory.saturating_sub(self.used_memory);

        if size > available {
            self.counters.record_rejected_full();
            warn!(key = %key, size, available, "cache is full, value rejected");
            return Err(CacheError::CacheFull {
                key,
                size,
                available,
            });
        }

        if self.entries.contains_key(&key) {
            self.counters.record_rejected_duplicate();
            warn!(key = %key, "key already exists, value rejected");
            return Err(CacheError::KeyAlreadyExists(key));
        }

        self.insert(key, CacheEntry::new(value, size, ttl));
        Ok(())
    }

    // == Insert ==
    /// Mutation step of `set_sized`. Admission has already been decided.
    fn insert(&mut self, key: String, entry: CacheEntry<V>) {
        self.used_memory += entry.size;
        if let Some(deadline) = entry.expires_at {
            self.expiry.schedule(&key, deadline);
        }
        debug!(key = %key, size = entry.size, ttl = ?entry.ttl_remaining(), "entry stored");
        self.entries.insert(key, entry);
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Entries past their deadline that have not been purged yet are
    /// reported as missing.
    pub fn get(&self, key: &str) -> Result<Arc<V>> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.counters.record_hit();
                Ok(Arc::clone(&entry.value))
            }
            _ => {
                self.counters.record_miss();
                Err(CacheError::KeyNotFound(key.to_string()))
            }
        }
    }

    // == Contains ==
    /// Membership check that does not touch the TTL or statistics.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Delete ==
    /// Removes an entry by key, cancelling its deadline.
    ///
    /// Returns the removed entry.
    pub fn delete(&mut self, key: &str) -> Result<CacheEntry<V>> {
        self.purge_expired(Instant::now());

        let entry = self
            .remove_entry(key)
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))?;
        debug!(key, age = ?entry.age(), "entry deleted");
        Ok(entry)
    }

    /// Shared removal path for delete and expiry.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.expiry.cancel(key);
        debug_assert!(self.used_memory >= entry.size);
        self.used_memory = self.used_memory.saturating_sub(entry.size);
        Some(entry)
    }

    // == Flush ==
    /// Removes every entry and disarms every deadline.
    ///
    /// Returns the number of entries removed.
    pub fn flush(&mut self) -> usize {
        self.purge_expired(Instant::now());

        let removed = self.entries.len();
        self.entries.clear();
        self.expiry.clear();
        self.used_memory = 0;
        removed
    }

    // == Purge Expired ==
    /// Removes every entry whose deadline is at or before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;

        while let Some(key) = self.expiry.pop_expired(now) {
            if let Some(entry) = self.remove_entry(&key) {
                self.counters.record_expiration();
                debug!(key = %key, age = ?entry.age(), "entry expired");
                removed += 1;
            }
        }

        removed
    }

    // == Next Deadline ==
    /// Returns the earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.expiry.next_deadline()
    }

    // == Time To Live ==
    /// Returns the remaining TTL for a key.
    ///
    /// None when the key is absent or never expires.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(CacheEntry::ttl_remaining)
    }

    // == Due Entries ==
    /// Count and total size of entries past their deadline but not yet purged.
    fn due(&self) -> (usize, u64) {
        self.expiry
            .due(Instant::now())
            .filter_map(|key| self.entries.get(key))
            .fold((0, 0), |(count, bytes), entry| (count + 1, bytes + entry.size))
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (due_count, due_bytes) = self.due();
        self.counters.snapshot(
            self.entries.len() - due_count,
            self.used_memory - due_bytes,
            self.max_memory,
        )
    }

    // == Memory ==
    /// Estimated bytes held by live entries.
    pub fn used_memory(&self) -> u64 {
        self.used_memory - self.due().1
    }

    /// Configured memory budget in bytes.
    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }

    // == Length ==
    /// Returns the current number of live entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len() - self.due().0
    }

    // == Is Empty ==
    /// Returns true if the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MEMORY)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn store_with(max_memory: u64) -> CacheStore<String> {
        CacheStore::new(max_memory)
    }

    #[test]
    fn test_store_new() {
        let store: CacheStore<String> = CacheStore::default();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.max_memory(), DEFAULT_MAX_MEMORY);
        assert_eq!(store.used_memory(), 0);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store_with(1024);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();
        let value = store.get("key1").unwrap();

        assert_eq!(*value, "value1");
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_memory(), "value1".to_string().estimated_size() as u64);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = store_with(1024);

        let result = store.get("nonexistent");
        assert!(matches!(result, Err(CacheError::KeyNotFound(_))));
    }

    #[test]
    fn test_store_duplicate_key_rejected() {
        let mut store = store_with(1024);

        store.set_sized("key1".to_string(), "value1".to_string(), 10, None).unwrap();
        let result = store.set_sized("key1".to_string(), "value2".to_string(), 10, None);

        assert_eq!(result, Err(CacheError::KeyAlreadyExists("key1".to_string())));
        assert_eq!(*store.get("key1").unwrap(), "value1");
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_memory(), 10);
        assert_eq!(store.stats().rejected_duplicate, 1);
    }

    #[test]
    fn test_store_full_rejected() {
        let mut store = store_with(100);

        store.set_sized("a".to_string(), "x".to_string(), 60, None).unwrap();
        let result = store.set_sized("b".to_string(), "y".to_string(), 41, None);

        assert_eq!(
            result,
            Err(CacheError::CacheFull {
                key: "b".to_string(),
                size: 41,
                available: 40,
            })
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_memory(), 60);
        assert!(store.get("b").is_err());
        assert_eq!(store.stats().rejected_full, 1);
    }

    #[test]
    fn test_store_fills_budget_exactly() {
        let mut store = store_with(100);

        store.set_sized("a".to_string(), "x".to_string(), 60, None).unwrap();
        store.set_sized("b".to_string(), "y".to_string(), 40, None).unwrap();

        assert_eq!(store.used_memory(), 100);
        assert!(store.set_sized("c".to_string(), "z".to_string(), 1, None).is_err());
        assert!(store.set_sized("d".to_string(), "z".to_string(), 0, None).is_ok());
    }

    #[test]
    fn test_store_full_checked_before_duplicate() {
        let mut store = store_with(10);

        store.set_sized("a".to_string(), "x".to_string(), 10, None).unwrap();
        let result = store.set_sized("a".to_string(), "y".to_string(), 5, None);

        assert!(matches!(result, Err(CacheError::CacheFull { .. })));
    }

    #[test]
    fn test_store_delete() {
        let mut store = store_with(1024);

        store.set_sized("key1".to_string(), "value1".to_string(), 30, None).unwrap();
        store.set_sized("key2".to_string(), "value2".to_string(), 20, None).unwrap();
        let removed = store.delete("key1").unwrap();

        assert_eq!(*removed.value, "value1");
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_memory(), 20);
        assert!(!store.contains("key1"));
        assert!(matches!(store.get("key1"), Err(CacheError::KeyNotFound(_))));
    }

    #[test]
    fn test_store_delete_nonexistent() {
        let mut store = store_with(1024);
        store.set_sized("key1".to_string(), "value1".to_string(), 30, None).unwrap();

        let result = store.delete("nonexistent");

        assert!(matches!(result, Err(CacheError::KeyNotFound(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_memory(), 30);
    }

    #[test]
    fn test_store_delete_cancels_deadline() {
        let mut store = store_with(1024);

        store
            .set_sized("key1".to_string(), "v".to_string(), 5, Some(Duration::from_millis(20)))
            .unwrap();
        assert!(store.next_deadline().is_some());

        store.delete("key1").unwrap();
        assert!(store.next_deadline().is_none());

        // reuse the key without a TTL; the old deadline must not remove it
        store.set_sized("key1".to_string(), "w".to_string(), 5, None).unwrap();
        sleep(Duration::from_millis(40));
        assert_eq!(store.purge_expired(Instant::now()), 0);
        assert_eq!(*store.get("key1").unwrap(), "w");
    }

    #[test]
    fn test_store_reinsert_after_delete() {
        let mut store = store_with(1024);

        store.set_sized("key1".to_string(), "value1".to_string(), 10, None).unwrap();
        store.delete("key1").unwrap();
        store.set_sized("key1".to_string(), "value2".to_string(), 10, None).unwrap();

        assert_eq!(*store.get("key1").unwrap(), "value2");
        assert_eq!(store.used_memory(), 10);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = store_with(1024);

        store
            .set_sized("key1".to_string(), "value1".to_string(), 10, Some(Duration::from_millis(50)))
            .unwrap();

        assert!(store.get("key1").is_ok());

        sleep(Duration::from_millis(80));

        // Absent everywhere before the purge runs
        assert!(matches!(store.get("key1"), Err(CacheError::KeyNotFound(_))));
        assert!(!store.contains("key1"));
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.used_memory(), 0);
        assert_eq!(store.stats().total_entries, 0);
        assert!(store.ttl_remaining("key1").is_none());

        assert_eq!(store.purge_expired(Instant::now()), 1);
        assert_eq!(store.len(), 0);
        assert_eq!(store.used_memory(), 0);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_set_reuses_expired_key() {
        let mut store = store_with(1024);

        store
            .set_sized("k".to_string(), "old".to_string(), 10, Some(Duration::from_millis(10)))
            .unwrap();
        sleep(Duration::from_millis(40));
        assert!(!store.contains("k"));

        store.set_sized("k".to_string(), "new".to_string(), 12, None).unwrap();

        assert_eq!(*store.get("k").unwrap(), "new");
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_memory(), 12);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_expired_bytes_return_to_budget() {
        let mut store = store_with(100);

        store
            .set_sized("a".to_string(), "v".to_string(), 100, Some(Duration::from_millis(10)))
            .unwrap();
        assert!(store.set_sized("b".to_string(), "v".to_string(), 50, None).is_err());

        sleep(Duration::from_millis(40));

        store.set_sized("b".to_string(), "v".to_string(), 50, None).unwrap();
        store.set_sized("c".to_string(), "v".to_string(), 50, None).unwrap();
        assert!(!store.contains("a"));
        assert_eq!(store.used_memory(), 100);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_delete_expired_key_not_found() {
        let mut store = store_with(1024);

        store
            .set_sized("k".to_string(), "v".to_string(), 10, Some(Duration::from_millis(10)))
            .unwrap();
        sleep(Duration::from_millis(40));

        assert!(matches!(store.delete("k"), Err(CacheError::KeyNotFound(_))));
        assert_eq!(store.used_memory(), 0);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_purge_keeps_live_entries() {
        let mut store = store_with(1024);

        store
            .set_sized("short".to_string(), "v".to_string(), 10, Some(Duration::from_millis(20)))
            .unwrap();
        store
            .set_sized("long".to_string(), "v".to_string(), 15, Some(Duration::from_secs(60)))
            .unwrap();
        store.set_sized("forever".to_string(), "v".to_string(), 20, None).unwrap();

        sleep(Duration::from_millis(40));

        assert_eq!(store.purge_expired(Instant::now()), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.used_memory(), 35);
        assert!(store.contains("long"));
        assert!(store.contains("forever"));
    }

    #[test]
    fn test_store_purge_after_delete_does_not_double_count() {
        let mut store = store_with(1024);

        store
            .set_sized("key1".to_string(), "v".to_string(), 10, Some(Duration::from_millis(50)))
            .unwrap();

        store.delete("key1").unwrap();
        sleep(Duration::from_millis(70));
        assert_eq!(store.purge_expired(Instant::now()), 0);
        assert_eq!(store.used_memory(), 0);
        assert!(store.delete("key1").is_err());
    }

    #[test]
    fn test_store_zero_ttl_never_expires() {
        let mut store = store_with(1024);

        store
            .set_sized("key1".to_string(), "v".to_string(), 1, Some(Duration::ZERO))
            .unwrap();

        assert!(store.next_deadline().is_none());
        assert!(store.ttl_remaining("key1").is_none());
    }

    #[test]
    fn test_store_flush() {
        let mut store = store_with(1024);

        store.set_sized("a".to_string(), "v".to_string(), 10, None).unwrap();
        store
            .set_sized("b".to_string(), "v".to_string(), 10, Some(Duration::from_secs(60)))
            .unwrap();

        assert_eq!(store.flush(), 2);
        assert!(store.is_empty());
        assert_eq!(store.used_memory(), 0);
        assert!(store.next_deadline().is_none());
        assert!(store.get("a").is_err());
        assert!(store.get("b").is_err());
    }

    #[test]
    fn test_store_set_max_memory() {
        let mut store = store_with(1024);

        assert_eq!(store.set_max_memory("2MB").unwrap(), 2 * 1024 * 1024);
        assert_eq!(store.max_memory(), 2 * 1024 * 1024);

        let result = store.set_max_memory("bogus");
        assert_eq!(result, Err(CacheError::InvalidSizeLiteral("bogus".to_string())));
        assert_eq!(store.max_memory(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_store_shrink_below_usage_is_applied() {
        let mut store = store_with(1024);
        store.set_sized("a".to_string(), "v".to_string(), 600, None).unwrap();

        assert_eq!(store.set_max_memory("512").unwrap(), 512);

        // Nothing is evicted, new inserts are refused
        assert_eq!(store.len(), 1);
        assert_eq!(store.used_memory(), 600);
        assert!(matches!(
            store.set_sized("b".to_string(), "v".to_string(), 1, None),
            Err(CacheError::CacheFull { available: 0, .. })
        ));

        store.delete("a").unwrap();
        assert!(store.set_sized("b".to_string(), "v".to_string(), 1, None).is_ok());
    }

    #[test]
    fn test_store_stats() {
        let mut store = store_with(1024);

        store.set_sized("key1".to_string(), "value1".to_string(), 8, None).unwrap();
        store.get("key1").unwrap(); // hit
        let _ = store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.used_memory, 8);
        assert_eq!(stats.max_memory, 1024);
    }

    #[test]
    fn test_store_contains_does_not_count_hits() {
        let mut store = store_with(1024);
        store.set_sized("key1".to_string(), "v".to_string(), 1, None).unwrap();

        assert!(store.contains("key1"));
        assert!(!store.contains("key2"));
        assert_eq!(store.stats().hits, 0);
        assert_eq!(store.stats().misses, 0);
    }
}
