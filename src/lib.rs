//! Response Cache - an in-process TTL and size-bounded LRU cache
//!
//! Caches the results of expensive lookups for a configurable lifetime,
//! bounded by entry count and by an estimate of stored bytes. Keys are
//! namespaced by category prefix so one data category can be dropped without
//! touching the others.
//!
//! - [`Cache`] is the shared store handle.
//! - [`Memoizer`] wraps an async producer and caches its results by argument.
//! - [`Janitor`] periodically sweeps expired entries in the background.

pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod tasks;
pub mod telemetry;

pub use cache::{Cache, CacheStats, CallArgs};
pub use config::{CacheConfig, CategoryTtls, LogFormat};
pub use error::{CacheError, Result};
pub use memo::{Category, Memoized, Memoizer};
pub use tasks::Janitor;
pub use telemetry::init_tracing;
