//! Shared Cache Handle
//!
//! A cloneable, thread-safe handle to one [`CacheStore`]. Construct it once at
//! startup and pass clones to every collaborator that needs caching.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{CacheStats, CacheStore};
use crate::config::CacheConfig;
use crate::error::Result;

// == Cache Handle ==
/// Process-wide cache handle.
///
/// Every operation takes the single store mutex for its whole duration, so
/// operations are linearizable. None of them suspend or do I/O.
#[derive(Clone)]
pub struct Cache {
    store: Arc<Mutex<CacheStore>>,
}

impl Cache {
    // == Constructors ==
    /// Creates a cache bounded by entry count and summed size estimate.
    pub fn new(max_entries: usize, max_size_bytes: usize) -> Result<Self> {
        let store = CacheStore::new(max_entries, max_size_bytes)?;
        info!(max_entries, max_size_bytes, "Initialized cache store");
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
        })
    }

    /// Creates a cache from validated configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.max_entries, config.max_size_bytes)
    }

    /// Acquires the store lock, clearing poison left by a panicked holder.
    fn lock(&self) -> MutexGuard<'_, CacheStore> {
        self.store.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Cache store lock was poisoned; recovering");
            self.store.clear_poison();
            poisoned.into_inner()
        })
    }

    // == Store API ==
    /// See [`CacheStore::set`].
    pub fn set(&self, key: &str, value: Value, ttl_seconds: u64, prefix: &str) -> Result<()> {
        self.lock().set(key, value, ttl_seconds, prefix)
    }

    /// See [`CacheStore::get`].
    pub fn get(&self, key: &str, prefix: &str) -> Option<Value> {
        self.lock().get(key, prefix)
    }

    /// See [`CacheStore::exists`].
    pub fn exists(&self, key: &str, prefix: &str) -> bool {
        self.lock().exists(key, prefix)
    }

    pub fn delete(&self, key: &str, prefix: &str) -> bool {
        self.lock().delete(key, prefix)
    }

    pub fn clear_by_prefix(&self, prefix: &str) -> usize {
        let count = self.lock().clear_by_prefix(prefix);
        info!(prefix, count, "Cleared cache entries by prefix");
        count
    }

    pub fn clear(&self) -> usize {
        let count = self.lock().clear();
        info!(count, "Cleared all cache entries");
        count
    }

    /// See [`CacheStore::cleanup_expired`].
    pub fn cleanup_expired(&self) -> usize {
        self.lock().cleanup_expired()
    }

    /// Deletes `key` under each of `prefixes`; returns how many existed.
    ///
    /// Used to drop everything cached about one subject across categories.
    pub fn invalidate(&self, key: &str, prefixes: &[&str]) -> usize {
        let mut store = self.lock();
        prefixes
            .iter()
            .filter(|prefix| store.delete(key, prefix))
            .count()
    }

    pub fn ttl_remaining(&self, key: &str, prefix: &str) -> Option<Duration> {
        self.lock().ttl_remaining(key, prefix)
    }

    pub fn keys(&self, prefix: Option<&str>) -> Vec<String> {
        self.lock().keys(prefix)
    }

    // == Stats ==
    /// Consistent snapshot of counters and size.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    pub fn reset_stats(&self) {
        self.lock().reset_stats();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.lock().size_bytes()
    }

    /// Runs `f` with exclusive access to the store.
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut CacheStore) -> R) -> R {
        f(&mut self.lock())
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never block: the caller may already hold the lock
        let store = match self.store.try_lock() {
            Ok(store) => store,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return f.debug_struct("Cache").field("store", &"<locked>").finish();
            }
        };

        f.debug_struct("Cache")
            .field("entries", &store.len())
            .field("size_bytes", &store.size_bytes())
            .field("max_entries", &store.max_entries())
            .finish()
    }
}
