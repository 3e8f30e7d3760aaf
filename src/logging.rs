//! Tracing subscriber setup.
//!
//! The codec itself only emits `tracing` events; installing a subscriber is
//! left to the host application. [`init`] is the stock setup: `RUST_LOG`
//! when present, otherwise the configured level.

use crate::config::CodecConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        /// The rejected directive.
        directive: String,
        /// Parser failure.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Filter from `RUST_LOG`, falling back to `config.log_level`.
pub fn env_filter(config: &CodecConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_level).map_err(|source| LoggingError::Filter {
        directive: config.log_level.clone(),
        source,
    })
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &CodecConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(LoggingError::Install)?;
    tracing::debug!(level = %config.log_level, json = config.log_json, "logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_config_level() {
        std::env::remove_var(EnvFilter::DEFAULT_ENV);
        let config = CodecConfig {
            log_level: "debug".to_string(),
            ..CodecConfig::default()
        };
        let filter = env_filter(&config).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_bad_directive() {
        std::env::remove_var(EnvFilter::DEFAULT_ENV);
        let config = CodecConfig {
            log_level: "tau_codec=loud".to_string(),
            ..CodecConfig::default()
        };
        assert!(matches!(
            env_filter(&config),
            Err(LoggingError::Filter { .. })
        ));
    }
}
