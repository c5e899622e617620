//! Memoizer
//!
//! Wraps an async producer so repeated calls with equal arguments are served
//! from the cache for the lifetime of the TTL.
//!
//! There is no per-key locking: concurrent misses on one key may each run the
//! producer, and the last result stored wins.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{stable_key, Cache, CallArgs};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::memo::Category;

type KeyFn = Arc<dyn Fn(&CallArgs) -> String + Send + Sync>;
type SkipFn = Arc<dyn Fn(&CallArgs) -> bool + Send + Sync>;

// == Memoizer ==
/// Per-call-site caching policy: TTL, prefix and key derivation.
#[derive(Clone)]
pub struct Memoizer {
    cache: Cache,
    ttl_seconds: u64,
    prefix: String,
    name: Option<String>,
    key_fn: Option<KeyFn>,
    skip_fn: Option<SkipFn>,
}

impl Memoizer {
    // == Constructors ==
    /// Creates a memoizer storing results under `prefix` for `ttl_seconds`.
    ///
    /// # Errors
    /// [`CacheError::InvalidConfig`] when the TTL is zero.
    pub fn new(cache: Cache, ttl_seconds: u64, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if ttl_seconds == 0 {
            return Err(CacheError::config(format!(
                "memoizer TTL for prefix '{prefix}' must be positive"
            )));
        }

        Ok(Self {
            cache,
            ttl_seconds,
            prefix,
            name: None,
            key_fn: None,
            skip_fn: None,
        })
    }

    /// Creates a memoizer using a category's prefix and configured TTL.
    pub fn for_category(cache: Cache, category: Category, config: &CacheConfig) -> Result<Self> {
        Self::new(cache, category.ttl(&config.ttls), category.prefix())
    }

    // == Builder ==
    /// Names the producer; the name becomes part of every key.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the argument digest with a caller-supplied key.
    pub fn key_with<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&CallArgs) -> String + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(key_fn));
        self
    }

    /// Bypasses the cache entirely for calls matching `predicate`.
    pub fn skip_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CallArgs) -> bool + Send + Sync + 'static,
    {
        self.skip_fn = Some(Arc::new(predicate));
        self
    }

    // == Accessors ==
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Key a call is stored under, without the prefix.
    pub fn key_for(&self, args: &CallArgs) -> String {
        match &self.key_fn {
            Some(key_fn) => key_fn(args),
            None => stable_key(self.name.as_deref(), args),
        }
    }

    // == Call ==
    /// Returns the cached result for `args`, or runs `producer` and caches
    /// its `Ok` value.
    ///
    /// An `Err` from the producer is returned unchanged and nothing is stored,
    /// so the next identical call runs the producer again.
    pub async fn call<T, E, F, Fut>(&self, args: CallArgs, producer: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(CallArgs) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if self.skips(&args) {
            return producer(args).await;
        }

        let key = self.key_for(&args);
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }

        let result = producer(args).await;
        self.record(&key, &result);
        result
    }

    /// Blocking counterpart of [`Memoizer::call`] for synchronous producers.
    pub fn call_sync<T, E, F>(&self, args: CallArgs, producer: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(CallArgs) -> std::result::Result<T, E>,
    {
        if self.skips(&args) {
            return producer(args);
        }

        let key = self.key_for(&args);
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }

        let result = producer(args);
        self.record(&key, &result);
        result
    }

    fn skips(&self, args: &CallArgs) -> bool {
        let skip = self.skip_fn.as_ref().is_some_and(|skip| skip(args));
        if skip {
            debug!(prefix = %self.prefix, "Skipping cache for call");
        }
        skip
    }

    /// Cached value for `key`, if present and of the expected shape.
    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.cache.get(key, &self.prefix)?;
        match serde_json::from_value::<T>(cached) {
            Ok(value) => {
                debug!(prefix = %self.prefix, key, "Cache hit for memoized call");
                Some(value)
            }
            Err(err) => {
                warn!(
                    prefix = %self.prefix,
                    key,
                    error = %err,
                    "Cached value does not match the expected type; refetching"
                );
                None
            }
        }
    }

    fn record<T: Serialize, E>(&self, key: &str, result: &std::result::Result<T, E>) {
        match result {
            Ok(value) => self.store(key, value),
            Err(_) => debug!(prefix = %self.prefix, key, "Producer failed; nothing cached"),
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(err) => {
                warn!(prefix = %self.prefix, key, error = %err, "Result is not serializable; not cached");
                return;
            }
        };

        match self.cache.set(key, json, self.ttl_seconds, &self.prefix) {
            Ok(()) => debug!(
                prefix = %self.prefix,
                key,
                ttl_seconds = self.ttl_seconds,
                "Cached memoized result"
            ),
            Err(err) => warn!(prefix = %self.prefix, key, error = %err, "Failed to cache memoized result"),
        }
    }

    // == Wrap ==
    /// Binds a producer to this policy, giving a reusable memoized callable.
    pub fn wrap<F>(self, producer: F) -> Memoized<F> {
        Memoized {
            memo: self,
            producer,
        }
    }
}

impl fmt::Debug for Memoizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("prefix", &self.prefix)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("name", &self.name)
            .field("custom_key", &self.key_fn.is_some())
            .field("skip_rule", &self.skip_fn.is_some())
            .finish()
    }
}

// == Memoized ==
/// A producer bundled with its memoization policy.
#[derive(Clone)]
pub struct Memoized<F> {
    memo: Memoizer,
    producer: F,
}

impl<F> Memoized<F> {
    /// Calls the producer through the cache.
    pub async fn call<T, E, Fut>(&self, args: CallArgs) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(CallArgs) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.memo.call(args, &self.producer).await
    }

    pub fn memoizer(&self) -> &Memoizer {
        &self.memo
    }
}
