//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions
//! and expirations, plus the size figures captured at snapshot time.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache performance metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted to respect capacity or size bounds
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries in the cache
    pub entries: usize,
    /// Sum of the size estimates of all current entries
    pub total_size_bytes: usize,
    /// Mean remaining TTL of current entries, in seconds
    pub average_ttl_secs: f64,
    /// When counting started (store creation or last reset)
    pub created_at: DateTime<Utc>,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self {
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            entries: 0,
            total_size_bytes: 0,
            average_ttl_secs: 0.0,
            created_at: Utc::now(),
        }
    }
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of lookups recorded.
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Adds `count` expired removals.
    pub fn record_expirations(&mut self, count: u64) {
        self.expirations += count;
    }

    // == Reset ==
    /// Zeroes the counters and restarts the creation clock.
    pub fn reset(&mut self) {
        *self = Self {
            entries: self.entries,
            total_size_bytes: self.total_size_bytes,
            ..Self::default()
        };
    }
}
