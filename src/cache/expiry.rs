//! Expiry Queue Module
//!
//! Time-ordered schedule of entry deadlines with cancellation by key.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

// == Expiry Queue ==
/// Tracks pending deadlines for TTL-bearing entries.
///
/// Deadlines are ordered by instant, with a sequence number breaking ties
/// between keys that share a deadline. Each key has at most one deadline.
#[derive(Debug, Default)]
pub struct ExpiryQueue {
    /// Deadlines in firing order
    deadlines: BTreeMap<(Instant, u64), String>,
    /// Reverse index used for cancellation
    by_key: HashMap<String, (Instant, u64)>,
    /// Tie-breaker for equal deadlines
    next_seq: u64,
}

impl ExpiryQueue {
    // == Constructor ==
    /// Creates a new empty expiry queue.
    pub fn new() -> Self {
        Self::default()
    }

    // == Schedule ==
    /// Arms a deadline for a key, replacing any deadline it already had.
    pub fn schedule(&mut self, key: &str, deadline: Instant) {
        self.cancel(key);

        let slot = (deadline, self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);

        self.deadlines.insert(slot, key.to_string());
        self.by_key.insert(key.to_string(), slot);
    }

    // == Cancel ==
    /// Disarms the deadline for a key.
    ///
    /// Returns true if the key had a pending deadline.
    pub fn cancel(&mut self, key: &str) -> bool {
        match self.by_key.remove(key) {
            Some(slot) => {
                self.deadlines.remove(&slot);
                true
            }
            None => false,
        }
    }

    // == Next Deadline ==
    /// Returns the earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.keys().next().map(|(deadline, _)| *deadline)
    }

    // == Pop Expired ==
    /// Removes and returns the earliest key whose deadline is at or before `now`.
    ///
    /// Returns None once no due deadlines remain.
    pub fn pop_expired(&mut self, now: Instant) -> Option<String> {
        let mut first = self.deadlines.first_entry()?;
        if first.key().0 > now {
            return None;
        }
        let key = first.remove();
        self.by_key.remove(&key);
        Some(key)
    }

    // == Due ==
    /// Keys whose deadline is at or before `now`, earliest first, without
    /// removing them.
    pub fn due(&self, now: Instant) -> impl Iterator<Item = &str> {
        self.deadlines
            .range(..=(now, u64::MAX))
            .map(|(_, key)| key.as_str())
    }

    // == Clear ==
    /// Disarms every pending deadline.
    pub fn clear(&mut self) {
        self.deadlines.clear();
        self.by_key.clear();
    }

    // == Length ==
    /// Returns the number of armed deadlines.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    // == Contains ==
    /// Checks if a key has an armed deadline.
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }
}
