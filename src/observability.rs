//! # Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over
//! the configured filter.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::LogConfig;

const FALLBACK_FILTER: &str = "info";

fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the subscriber; fails if one is already installed
pub fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
        tracing_subscriber::fmt::layer().json().with_target(true).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_filter(config))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_falls_back() {
        let config = LogConfig {
            filter: "[[not a filter".to_string(),
            json: false,
        };
        // Must not panic whatever RUST_LOG holds.
        let _ = build_filter(&config);
    }

    #[test]
    fn test_configured_filter_used_without_env() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            filter: "hoodbook=debug".to_string(),
            json: true,
        };
        assert_eq!(build_filter(&config).to_string(), "hoodbook=debug");

        let invalid = LogConfig {
            filter: "hoodbook=loudest".to_string(),
            json: false,
        };
        assert_eq!(build_filter(&invalid).to_string(), FALLBACK_FILTER);
    }
}
