//! Wire codec for calibration instrument responses.
//!
//! This library turns the text an instrument sends back into typed records
//! and renders records back into command text. It covers positional channel
//! and scan configurations, JSON payloads wrapped in `$type` envelopes,
//! streamed readings and the instrument's timestamp forms. Transports are
//! out of scope; the [`transport`] and [`client`] modules only define the
//! seam a real one plugs into.

/// Positional channel configuration codec.
pub mod channel;
/// Instrument client over a transport.
pub mod client;
/// Layered configuration.
pub mod config;
/// `$type` envelope decoding.
pub mod envelope;
/// Codec errors.
pub mod error;
/// Tracing subscriber setup.
pub mod logging;
/// Reading decoder.
pub mod reading;
/// Decoded record types.
pub mod records;
/// Wire type registry.
pub mod registry;
/// Scan configuration codec.
pub mod scan;
/// Instrument timestamps.
pub mod time_tag;
/// Command transport seam.
pub mod transport;

pub use channel::{ChannelConfig, ChannelKind, FunctionType, WireNumber};
pub use client::{CalibratorClient, ClientError};
pub use config::CodecConfig;
pub use envelope::{Decoded, EnvelopeDecoder};
pub use error::{CodecError, CodecResult, Component};
pub use reading::{Reading, ReadingDecoder, TemperatureReading};
pub use records::{DiModuleInfo, Record};
pub use registry::TypeRegistry;
pub use scan::ScanConfig;
pub use time_tag::TimeTag;
pub use transport::{CommandTransport, MockTransport};
