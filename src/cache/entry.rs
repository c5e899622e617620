//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support
//! and the size estimate used for global byte accounting.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

/// Size assumed for any JSON number.
const NUMBER_SIZE: usize = 8;
/// Size assumed for a JSON boolean.
const BOOL_SIZE: usize = 1;
/// Size of a JSON null, as rendered.
const NULL_SIZE: usize = 4;

// == Cache Entry ==
/// Represents a single cache slot with value and bookkeeping metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Insertion (or last refresh) time
    pub created_at: Instant,
    /// Lifetime of the entry
    pub ttl: Duration,
    /// Approximate memory footprint in bytes
    pub size_estimate: usize,
    /// Updated on every successful read, drives LRU ordering
    pub last_accessed_at: Instant,
    /// Number of successful reads
    pub access_count: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now`.
    ///
    /// The caller is responsible for rejecting a zero TTL before getting here.
    pub fn new(value: Value, ttl: Duration, now: Instant) -> Self {
        let size_estimate = estimate_size(&value);

        Self {
            value,
            created_at: now,
            ttl,
            size_estimate,
            last_accessed_at: now,
            access_count: 0,
        }
    }

    // == Expiry ==
    /// Instant at which the entry stops being usable, `None` if that lies
    /// beyond what the clock can represent.
    pub fn expires_at(&self) -> Option<Instant> {
        self.created_at.checked_add(self.ttl)
    }

    /// Time elapsed since insertion, zero for instants before it.
    fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Checks expiry against a given instant.
    ///
    /// Boundary condition: the entry is expired once `now >= created_at + ttl`,
    /// so a read landing exactly on the boundary misses.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.age_at(now) >= self.ttl
    }

    /// Checks expiry against the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Access ==
    /// Records a successful read and returns the value.
    pub fn touch(&mut self, now: Instant) -> &Value {
        self.last_accessed_at = now;
        self.access_count += 1;
        &self.value
    }

    // == Time To Live ==
    /// Returns remaining lifetime, saturating at zero once expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.ttl.saturating_sub(self.age_at(now))
    }
}

// == Size Estimation ==
/// Estimates the in-memory footprint of a JSON value in bytes.
///
/// Strings count their UTF-8 length, numbers and booleans a fixed width,
/// containers the sum of their parts (object keys included).
pub fn estimate_size(value: &Value) -> usize {
    match value {
        Value::Null => NULL_SIZE,
        Value::Bool(_) => BOOL_SIZE,
        Value::Number(_) => NUMBER_SIZE,
        Value::String(s) => s.len(),
        Value::Array(items) => items.iter().map(estimate_size).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| k.len() + estimate_size(v))
            .sum(),
    }
}
