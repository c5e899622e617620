//! Logging setup
//!
//! Installs the global tracing subscriber from [`CacheConfig`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{CacheConfig, LogFormat};
use crate::error::{CacheError, Result};

/// Installs a tracing subscriber writing to stdout.
///
/// `RUST_LOG` takes precedence over the configured `log_level`. Fails if a
/// global subscriber is already set, or if the filter directive is invalid.
pub fn init_tracing(config: &CacheConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.log_level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
    };

    installed.map_err(|err| CacheError::Telemetry(err.to_string()))
}

fn build_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|err| {
        CacheError::config(format!("LOG_LEVEL '{directive}' is not a valid filter: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("response_cache=debug,warn").is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        assert!(matches!(
            build_filter("response_cache=loud"),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_second_init_fails() {
        let config = CacheConfig::default();
        let _ = init_tracing(&config);
        assert!(matches!(
            init_tracing(&config),
            Err(CacheError::Telemetry(_))
        ));
    }
}
