//! Error types for the codec.
//!
//! Every decode and encode path in this crate reports failures through
//! [`CodecError`]. Using the `thiserror` crate, it gives a single, consistent
//! error surface that carries enough context to tell *which* component rejected
//! a payload and *what* was wrong with it.
//!
//! ## Error Hierarchy
//!
//! - **`UnknownTypeTag`**: a JSON `$type` string that the type registry does not
//!   know. Never silently defaulted.
//! - **`UnsupportedDiscriminant`**: a channel configuration whose
//!   `ElectricalFunctionType` code is outside the supported set.
//! - **`FieldCountMismatch`**: positional text with more or fewer fields than the
//!   selected layout declares.
//! - **`InconsistentSampleMetadata`**: samples of one reading disagree on channel,
//!   unit or precision.
//! - **`MalformedTimestamp`**: a time token that matches none of the recognised forms.
//! - **`InvalidField`**: a positional token that cannot be parsed as the field's
//!   declared primitive type.
//! - **`MalformedEnvelope`** / **`EnvelopeTooDeep`** / **`RecordConstruction`**:
//!   structural problems in JSON envelopes.
//!
//! Codec errors are always returned to the immediate caller. The codec performs
//! no retries and never drops part of a payload to make the rest decode.

use std::fmt;
use thiserror::Error;

/// Convenience alias for results using the codec error type.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// The codec component that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Timestamp parsing.
    TimeTag,
    /// Type tag lookup.
    Registry,
    /// `$type` envelope decoding.
    Envelope,
    /// Channel configuration codec.
    ChannelConfig,
    /// Scan configuration codec.
    ScanConfig,
    /// Reading decoder.
    Reading,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::TimeTag => "time tag",
            Component::Registry => "type registry",
            Component::Envelope => "envelope",
            Component::ChannelConfig => "channel configuration",
            Component::ScanConfig => "scan configuration",
            Component::Reading => "reading",
        };
        f.write_str(name)
    }
}

/// Everything that can go wrong while decoding or encoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A `$type` name, or a collection element type, that is not registered.
    #[error("Unknown type tag: '{tag}'")]
    UnknownTypeTag {
        /// The full tag as received.
        tag: String,
    },

    /// A function type code outside the supported set.
    #[error("Unsupported electrical function type: {code}")]
    UnsupportedDiscriminant {
        /// The code as received.
        code: i64,
    },

    /// A record with more or fewer fields than its layout declares.
    #[error("{component} '{layout}' expects {expected} fields, got {actual}")]
    FieldCountMismatch {
        /// Codec that rejected the record.
        component: Component,
        /// Layout the record was checked against.
        layout: String,
        /// Fields the layout declares.
        expected: usize,
        /// Fields the record holds.
        actual: usize,
    },

    /// Samples of one reading disagree on channel, unit or precision.
    #[error("Inconsistent {field} in reading for channel '{channel}': expected '{expected}', got '{actual}'")]
    InconsistentSampleMetadata {
        /// Channel of the first sample.
        channel: String,
        /// Which metadata differs.
        field: &'static str,
        /// Value from the first sample.
        expected: String,
        /// Value from the offending sample.
        actual: String,
    },

    /// A time token in none of the recognised forms, or out of the tick range.
    #[error("Malformed timestamp: '{token}'")]
    MalformedTimestamp {
        /// The rejected token.
        token: String,
    },

    /// A token that does not parse as its field's primitive type.
    #[error("Invalid {component} field '{field}': '{token}' is not a valid {expected}")]
    InvalidField {
        /// Codec that rejected the token.
        component: Component,
        /// Name of the field.
        field: &'static str,
        /// The rejected token.
        token: String,
        /// Description of what the field accepts.
        expected: &'static str,
    },

    /// A structurally invalid envelope.
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What was wrong.
        reason: String,
    },

    /// Nesting beyond the configured depth limit.
    #[error("Envelope nesting exceeds {limit} levels")]
    EnvelopeTooDeep {
        /// The configured limit.
        limit: usize,
    },

    /// A registered constructor rejected the envelope's fields.
    #[error("Failed to construct '{type_name}': {source}")]
    RecordConstruction {
        /// Tag whose constructor failed.
        type_name: String,
        /// Deserialisation failure.
        #[source]
        source: serde_json::Error,
    },

    /// The payload is not JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    /// The component that rejected the payload.
    pub fn component(&self) -> Component {
        match self {
            CodecError::UnknownTypeTag { .. } => Component::Registry,
            CodecError::UnsupportedDiscriminant { .. } => Component::ChannelConfig,
            CodecError::FieldCountMismatch { component, .. } => *component,
            CodecError::InconsistentSampleMetadata { .. } => Component::Reading,
            CodecError::MalformedTimestamp { .. } => Component::TimeTag,
            CodecError::InvalidField { component, .. } => *component,
            CodecError::MalformedEnvelope { .. }
            | CodecError::EnvelopeTooDeep { .. }
            | CodecError::RecordConstruction { .. }
            | CodecError::Json(_) => Component::Envelope,
        }
    }

    pub(crate) fn invalid_field(
        component: Component,
        field: &'static str,
        token: &str,
        expected: &'static str,
    ) -> Self {
        CodecError::InvalidField {
            component,
            field,
            token: token.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::UnknownTypeTag {
            tag: "Not.A.Real.Type".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown type tag: 'Not.A.Real.Type'");
        assert_eq!(err.component(), Component::Registry);
    }

    #[test]
    fn test_field_count_mismatch_names_layout() {
        let err = CodecError::FieldCountMismatch {
            component: Component::ChannelConfig,
            layout: "Sprt".to_string(),
            expected: 14,
            actual: 12,
        };
        let text = err.to_string();
        assert!(text.contains("Sprt"));
        assert!(text.contains("14"));
        assert!(text.contains("12"));
        assert_eq!(err.component(), Component::ChannelConfig);
    }
}
