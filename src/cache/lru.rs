//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{BTreeMap, HashMap};

use tokio::time::Instant;

// == LRU Rank ==
/// Eviction order of a key: oldest access first, ties broken by earliest
/// creation, then by touch sequence so the order stays total when the clock
/// reports equal instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LruRank {
    last_accessed_at: Instant,
    created_at: Instant,
    seq: u64,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys are held in an ordered map from rank to key, with a reverse index
/// so touching or removing a key is O(log n).
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Keys ordered by rank, first = least recently used
    order: BTreeMap<LruRank, String>,
    /// Current rank of every tracked key
    ranks: HashMap<String, LruRank>,
    /// Monotonic touch counter
    next_seq: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key created at `created_at` as used at `accessed_at`.
    ///
    /// If the key is already tracked its previous rank is replaced.
    pub fn touch(&mut self, key: &str, accessed_at: Instant, created_at: Instant) {
        self.remove(key);

        let rank = LruRank {
            last_accessed_at: accessed_at,
            created_at,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        self.order.insert(rank, key.to_string());
        self.ranks.insert(key.to_string(), rank);
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(rank) = self.ranks.remove(key) {
            self.order.remove(&rank);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ranks.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
        self.ranks.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ranks.contains_key(key)
    }
}
