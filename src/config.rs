//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(CacheError::config(format!(
                "LOG_FORMAT must be 'text' or 'json', got '{other}'"
            ))),
        }
    }
}

/// TTL presets, in seconds, for each data category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTtls {
    /// Fast-moving price data
    pub price: u64,
    /// Asset metadata
    pub metadata: u64,
    /// Historical series
    pub history: u64,
    /// Data that practically never changes
    pub static_data: u64,
}

impl Default for CategoryTtls {
    fn default() -> Self {
        Self {
            price: 30,
            metadata: 300,
            history: 3600,
            static_data: 86400,
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Ceiling on the summed size estimates of all entries
    pub max_size_bytes: usize,
    /// TTL preset per data category
    pub ttls: CategoryTtls,
    /// Janitor sweep interval in seconds
    pub cleanup_interval: u64,
    /// Default log filter directive
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_MAX_SIZE_BYTES` - Size budget in bytes (default: 64 MiB)
    /// - `CACHE_TTL_PRICE` - Price TTL in seconds (default: 30)
    /// - `CACHE_TTL_METADATA` - Metadata TTL in seconds (default: 300)
    /// - `CACHE_TTL_HISTORY` - History TTL in seconds (default: 3600)
    /// - `CACHE_TTL_STATIC` - Static data TTL in seconds (default: 86400)
    /// - `CACHE_CLEANUP_INTERVAL` - Janitor interval in seconds (default: 300)
    /// - `LOG_LEVEL` - Log filter (default: info)
    /// - `LOG_FORMAT` - `text` or `json` (default: text)
    ///
    /// # Errors
    /// [`CacheError::InvalidConfig`] for unparseable or non-positive values.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let config = Self {
            max_entries: parse_env("CACHE_MAX_ENTRIES", defaults.max_entries)?,
            max_size_bytes: parse_env("CACHE_MAX_SIZE_BYTES", defaults.max_size_bytes)?,
            ttls: CategoryTtls {
                price: parse_env("CACHE_TTL_PRICE", defaults.ttls.price)?,
                metadata: parse_env("CACHE_TTL_METADATA", defaults.ttls.metadata)?,
                history: parse_env("CACHE_TTL_HISTORY", defaults.ttls.history)?,
                static_data: parse_env("CACHE_TTL_STATIC", defaults.ttls.static_data)?,
            },
            cleanup_interval: parse_env("CACHE_CLEANUP_INTERVAL", defaults.cleanup_interval)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: match env::var("LOG_FORMAT") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.log_format,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects zero bounds, zero TTLs and a zero sweep interval.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::config("max_entries must be positive"));
        }
        if self.max_size_bytes == 0 {
            return Err(CacheError::config("max_size_bytes must be positive"));
        }
        if self.cleanup_interval == 0 {
            return Err(CacheError::config("cleanup_interval must be positive"));
        }

        let ttls = [
            ("price", self.ttls.price),
            ("metadata", self.ttls.metadata),
            ("history", self.ttls.history),
            ("static", self.ttls.static_data),
        ];
        if let Some((name, _)) = ttls.iter().find(|(_, ttl)| *ttl == 0) {
            return Err(CacheError::config(format!("{name} TTL must be positive")));
        }

        Ok(())
    }

    /// Janitor sweep interval as a Duration.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_size_bytes: 64 * 1024 * 1024,
            ttls: CategoryTtls::default(),
            cleanup_interval: 300,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

/// Reads and parses one variable, falling back to `default` when unset.
fn parse_env<T: FromStr>(var: &str, default: T) -> Result<T> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            CacheError::config(format!("{var} has an unparseable value '{raw}'"))
        }),
        Err(_) => Ok(default),
    }
}
