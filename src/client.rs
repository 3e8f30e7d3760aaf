//! Thin client pairing a [`CommandTransport`] with the codec.
//!
//! Command strings are supplied by the caller; the client only knows how to
//! decode what comes back and how to render what goes out.

use crate::channel::{decode_channel_configs, ChannelConfig};
use crate::config::{CodecConfig, EnvelopeSettings};
use crate::envelope::{Decoded, EnvelopeDecoder};
use crate::error::CodecError;
use crate::reading::{Reading, ReadingDecoder};
use crate::registry::TypeRegistry;
use crate::scan::{decode_scan_configs, ScanConfig};
use crate::transport::CommandTransport;
use thiserror::Error;
use tracing::debug;

/// Errors from a client round trip.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not deliver the command or its response.
    #[error("transport failed on '{command}': {source}")]
    Transport {
        /// Command that was being sent.
        command: String,
        /// Transport failure.
        #[source]
        source: anyhow::Error,
    },
    /// The response arrived but did not decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result alias for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Queries an instrument over `T` and decodes the responses.
pub struct CalibratorClient<T> {
    transport: T,
    registry: &'static TypeRegistry,
    envelope: EnvelopeSettings,
    readings: ReadingDecoder,
}

impl<T: CommandTransport> CalibratorClient<T> {
    /// Client over `transport` using the global registry and default settings.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            registry: TypeRegistry::global(),
            envelope: EnvelopeSettings::default(),
            readings: ReadingDecoder::default(),
        }
    }

    /// Client with the envelope and reading settings of `config`.
    pub fn with_config(transport: T, config: &CodecConfig) -> Self {
        Self {
            envelope: config.envelope.clone(),
            readings: ReadingDecoder::with_settings(&config.reading),
            ..Self::new(transport)
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `command` and decode channel configuration records.
    pub async fn query_channel_configs(&self, command: &str) -> ClientResult<Vec<ChannelConfig>> {
        let response = self.query(command).await?;
        let configs = decode_channel_configs(&response)?;
        debug!(command, count = configs.len(), "decoded channel configurations");
        Ok(configs)
    }

    /// Send `command` and decode scan configuration records.
    pub async fn query_scan_configs(&self, command: &str) -> ClientResult<Vec<ScanConfig>> {
        let response = self.query(command).await?;
        Ok(decode_scan_configs(&response)?)
    }

    /// Send `command` and decode a reading with the configured precision.
    pub async fn query_reading(&self, command: &str) -> ClientResult<Reading> {
        let response = self.query(command).await?;
        Ok(self.readings.decode(&response)?)
    }

    /// Query a JSON response and resolve its type envelopes.
    pub async fn query_envelope(&self, command: &str) -> ClientResult<Decoded> {
        let response = self.query(command).await?;
        let decoder = EnvelopeDecoder::with_settings(self.registry, &self.envelope);
        Ok(decoder.decode_str(&response)?)
    }

    /// Send `"<prefix> <encoded config>"`.
    pub async fn send_channel_config(&self, prefix: &str, config: &ChannelConfig) -> ClientResult<()> {
        let command = format!("{prefix} {}", config.encode());
        self.transport
            .command(&command)
            .await
            .map_err(|source| ClientError::Transport { command, source })
    }

    async fn query(&self, command: &str) -> ClientResult<String> {
        self.transport
            .query(command)
            .await
            .map_err(|source| ClientError::Transport {
                command: command.to_string(),
                source,
            })
    }
}
