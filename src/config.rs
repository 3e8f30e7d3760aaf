//! Codec configuration using Figment
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults
//! 2. `config/tau_codec.toml` (or a path given to [`CodecConfig::load_from`])
//! 3. Environment variables prefixed with `TAU_CODEC_`, `__` separating nested keys
//!
//! ```text
//! TAU_CODEC_LOG_LEVEL=debug
//! TAU_CODEC_LOG_JSON=true
//! TAU_CODEC_READING__TEMPERATURE_PRECISION=3
//! TAU_CODEC_ENVELOPE__MAX_DEPTH=16
//! ```
//!
//! A missing file is not an error; defaults and environment still apply.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::envelope::DEFAULT_MAX_DEPTH;
use crate::reading::DEFAULT_TEMPERATURE_PRECISION;

/// File read by [`CodecConfig::load`].
pub const DEFAULT_CONFIG_PATH: &str = "config/tau_codec.toml";
/// Environment variables with this prefix override file settings.
pub const ENV_PREFIX: &str = "TAU_CODEC_";

/// Largest temperature precision accepted; beyond this f64 carries no digits.
pub const MAX_TEMPERATURE_PRECISION: usize = 12;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider failed or a value had the wrong type.
    #[error("Configuration load error: {0}")]
    Load(#[from] figment::Error),
    /// Values loaded but are out of range.
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Top-level codec configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Default tracing level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit log lines as JSON objects instead of human-readable text
    #[serde(default)]
    pub log_json: bool,
    /// Reading decoder settings.
    #[serde(default)]
    pub reading: ReadingSettings,
    /// Envelope decoder settings.
    #[serde(default)]
    pub envelope: EnvelopeSettings,
}

/// Reading decoder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSettings {
    /// Decimal places for re-encoded temperature columns
    #[serde(default = "default_temperature_precision")]
    pub temperature_precision: usize,
}

/// Envelope decoder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeSettings {
    /// Maximum nesting of envelopes and lists
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            reading: ReadingSettings::default(),
            envelope: EnvelopeSettings::default(),
        }
    }
}

impl Default for ReadingSettings {
    fn default() -> Self {
        Self {
            temperature_precision: default_temperature_precision(),
        }
    }
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_temperature_precision() -> usize {
    DEFAULT_TEMPERATURE_PRECISION
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl CodecConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if a source is malformed or validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The layered provider chain, exposed for callers that merge more sources.
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(CodecConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is one of trace, debug, info, warn, error
    /// - Temperature precision is at most [`MAX_TEMPERATURE_PRECISION`]
    /// - Envelope depth limit is positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if self.reading.temperature_precision > MAX_TEMPERATURE_PRECISION {
            return Err(ConfigError::Validation(format!(
                "Invalid reading.temperature_precision {}. Must be 0-{}",
                self.reading.temperature_precision, MAX_TEMPERATURE_PRECISION
            )));
        }

        if self.envelope.max_depth == 0 {
            return Err(ConfigError::Validation(
                "Invalid envelope.max_depth 0. Must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
