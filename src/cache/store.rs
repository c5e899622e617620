//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking, TTL
//! expiration and a global byte budget. The store itself is not
//! synchronized; [`crate::cache::Cache`] wraps it in a mutex.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::error::{CacheError, Result};

/// Separator between a namespace prefix and the caller's key.
pub const PREFIX_SEPARATOR: char = ':';

// == Key Namespacing ==
/// Builds the stored key: `prefix:key`, or `key` alone when the prefix is empty.
pub fn full_key(key: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{PREFIX_SEPARATOR}{key}")
    }
}

// == Cache Store ==
/// Bounded key/value storage with LRU eviction and TTL support.
///
/// After every mutating call `len() <= max_entries` holds, and
/// `size_bytes() <= max_size_bytes` holds unless a single entry on its own
/// exceeds the byte budget.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage, keyed by full (prefixed) key
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance counters
    stats: CacheStats,
    /// Sum of `size_estimate` over all entries
    total_size_bytes: usize,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Advisory ceiling on the summed size estimates
    max_size_bytes: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given bounds.
    ///
    /// # Errors
    /// [`CacheError::InvalidConfig`] when either bound is zero.
    pub fn new(max_entries: usize, max_size_bytes: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(CacheError::config("max_entries must be positive"));
        }
        if max_size_bytes == 0 {
            return Err(CacheError::config("max_size_bytes must be positive"));
        }

        Ok(Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            total_size_bytes: 0,
            max_entries,
            max_size_bytes,
        })
    }

    // == Set ==
    /// Stores a value under `prefix:key` for `ttl_seconds`.
    ///
    /// Overwriting resets the value, size, TTL and creation time. When the
    /// insert would break a bound, least recently used entries are evicted
    /// one at a time until it fits.
    pub fn set(&mut self, key: &str, value: Value, ttl_seconds: u64, prefix: &str) -> Result<()> {
        self.set_at(key, value, ttl_seconds, prefix, Instant::now())
    }

    pub(crate) fn set_at(
        &mut self,
        key: &str,
        value: Value,
        ttl_seconds: u64,
        prefix: &str,
        now: Instant,
    ) -> Result<()> {
        let full_key = full_key(key, prefix);

        if ttl_seconds == 0 {
            warn!(key = %full_key, ttl_seconds, "Rejected cache insert with non-positive TTL");
            return Err(CacheError::InvalidTtl {
                key: full_key,
                ttl: ttl_seconds,
            });
        }

        let entry = CacheEntry::new(value, Duration::from_secs(ttl_seconds), now);
        let size = entry.size_estimate;

        // An overwrite frees its old slot first and is not an eviction
        self.remove_entry(&full_key);

        if size > self.max_size_bytes {
            warn!(
                key = %full_key,
                size_bytes = size,
                max_size_bytes = self.max_size_bytes,
                "Cached value alone exceeds the size budget; admitting it"
            );
        }

        while !self.entries.is_empty()
            && (self.entries.len() >= self.max_entries
                || self.total_size_bytes + size > self.max_size_bytes)
        {
            self.evict_lru();
        }

        self.total_size_bytes += size;
        self.lru.touch(&full_key, now, now);
        self.entries.insert(full_key.clone(), entry);

        debug!(key = %full_key, ttl_seconds, size_bytes = size, "Cached value");
        Ok(())
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Missing and expired keys count as misses; an expired entry is removed
    /// and also counted as an expiration. A hit refreshes the LRU position.
    pub fn get(&mut self, key: &str, prefix: &str) -> Option<Value> {
        self.get_at(key, prefix, Instant::now())
    }

    pub(crate) fn get_at(&mut self, key: &str, prefix: &str, now: Instant) -> Option<Value> {
        let full_key = full_key(key, prefix);

        let expired = match self.entries.get(&full_key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                debug!(key = %full_key, "Cache miss");
                return None;
            }
        };

        if expired {
            self.remove_entry(&full_key);
            self.stats.record_miss();
            self.stats.record_expirations(1);
            debug!(key = %full_key, "Cache entry expired");
            return None;
        }

        let entry = self.entries.get_mut(&full_key)?;
        let value = entry.touch(now).clone();
        let created_at = entry.created_at;
        self.lru.touch(&full_key, now, created_at);
        self.stats.record_hit();

        debug!(key = %full_key, "Cache hit");
        Some(value)
    }

    // == Exists ==
    /// Checks for a live entry without touching stats or access order.
    pub fn exists(&self, key: &str, prefix: &str) -> bool {
        self.exists_at(key, prefix, Instant::now())
    }

    pub(crate) fn exists_at(&self, key: &str, prefix: &str, now: Instant) -> bool {
        self.entries
            .get(&full_key(key, prefix))
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == TTL Remaining ==
    /// Remaining lifetime of a live entry, without side effects.
    pub fn ttl_remaining(&self, key: &str, prefix: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .get(&full_key(key, prefix))
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.ttl_remaining_at(now))
    }

    // == Delete ==
    /// Removes an entry; returns whether it existed.
    pub fn delete(&mut self, key: &str, prefix: &str) -> bool {
        let full_key = full_key(key, prefix);
        let existed = self.remove_entry(&full_key).is_some();
        if existed {
            debug!(key = %full_key, "Deleted cache entry");
        }
        existed
    }

    // == Clear By Prefix ==
    /// Removes every entry stored under `prefix:`; returns the count removed.
    pub fn clear_by_prefix(&mut self, prefix: &str) -> usize {
        let keys = self.keys(Some(prefix));
        let count = keys.len();

        for key in keys {
            self.remove_entry(&key);
        }

        count
    }

    // == Clear ==
    /// Removes every entry; returns the count removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.total_size_bytes = 0;
        count
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed, which is also added to the
    /// expiration counter.
    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(Instant::now())
    }

    pub(crate) fn cleanup_expired_at(&mut self, now: Instant) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.remove_entry(&key);
        }

        self.stats.record_expirations(count as u64);
        count
    }

    // == Keys ==
    /// Full keys currently stored, optionally limited to one prefix, sorted.
    ///
    /// Expired entries the janitor has not reached yet are included.
    pub fn keys(&self, prefix: Option<&str>) -> Vec<String> {
        let namespace = prefix.map(|p| format!("{p}{PREFIX_SEPARATOR}"));
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| namespace.as_deref().map_or(true, |ns| key.starts_with(ns)))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    // == Stats ==
    /// Returns a consistent snapshot of counters and current size.
    pub fn stats(&self) -> CacheStats {
        self.stats_at(Instant::now())
    }

    pub(crate) fn stats_at(&self, now: Instant) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.entries = self.entries.len();
        stats.total_size_bytes = self.total_size_bytes;
        stats.average_ttl_secs = if self.entries.is_empty() {
            0.0
        } else {
            let total: f64 = self
                .entries
                .values()
                .map(|entry| entry.ttl_remaining_at(now).as_secs_f64())
                .sum();
            total / self.entries.len() as f64
        };
        stats
    }

    /// Zeroes the counters; stored entries are untouched.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    // == Size Accessors ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the size estimates of all entries.
    pub fn size_bytes(&self) -> usize {
        self.total_size_bytes
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    // == Internal Bookkeeping ==
    /// Drops an entry from the map, the LRU order and the size total.
    fn remove_entry(&mut self, full_key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(full_key)?;
        self.lru.remove(full_key);
        let total = self.total_size_bytes;
        self.total_size_bytes = total.checked_sub(entry.size_estimate).unwrap_or_else(|| {
            panic!(
                "size accounting underflow removing '{}': total {} < entry {}",
                full_key, total, entry.size_estimate
            )
        });
        Some(entry)
    }

    /// Evicts the least recently used entry.
    fn evict_lru(&mut self) {
        let Some(victim) = self.lru.evict_oldest() else {
            unreachable!(
                "LRU tracker is empty while {} entries are stored",
                self.entries.len()
            );
        };

        self.remove_entry(&victim);
        self.stats.record_eviction();
        debug!(key = %victim, "Evicted LRU cache entry");
    }
}
