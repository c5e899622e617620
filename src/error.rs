//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Producer failures inside the memoizer are never wrapped in this type;
/// they reach the caller exactly as the producer returned them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Construction or environment configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An insertion was attempted with a non-positive TTL
    #[error("Invalid TTL for key '{key}': {ttl}s (must be positive)")]
    InvalidTtl { key: String, ttl: u64 },

    /// The global tracing subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Telemetry(String),
}

impl CacheError {
    /// Shorthand for an [`CacheError::InvalidConfig`] with a formatted reason.
    pub fn config(reason: impl Into<String>) -> Self {
        CacheError::InvalidConfig(reason.into())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_ttl_message() {
        let err = CacheError::InvalidTtl {
            key: "price:abc".to_string(),
            ttl: 0,
        };
        assert_eq!(
            err.to_string(),
            "Invalid TTL for key 'price:abc': 0s (must be positive)"
        );
    }

    #[test]
    fn test_config_shorthand() {
        let err = CacheError::config("max_entries must be positive");
        assert!(matches!(err, CacheError::InvalidConfig(_)));
        assert!(err.to_string().contains("max_entries"));
    }
}
