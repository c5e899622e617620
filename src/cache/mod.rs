//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, LRU eviction, a byte
//! budget and key namespacing.

mod entry;
mod handle;
mod key;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{estimate_size, CacheEntry};
pub use handle::Cache;
pub use key::{args_digest, stable_key, CallArgs, KEY_DIGEST_LEN};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{full_key, CacheStore, PREFIX_SEPARATOR};
