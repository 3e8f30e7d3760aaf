//! Scan configuration: integration time and the channel being scanned.
//!
//! Wire form is `"<nplc>,<channel name>"`, e.g. `10,REF1`.

use crate::channel::{WireNumber, FIELD_SEPARATOR, RECORD_SEPARATOR};
use crate::error::{CodecError, CodecResult, Component};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FIELD_COUNT: usize = 2;

/// Which channel the scanner measures, and for how long.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScanConfig {
    /// Integration time in power-line cycles.
    #[serde(rename = "NPLC")]
    pub nplc: Option<WireNumber<i64>>,
    /// Channel being scanned.
    pub channel_name: Option<String>,
}

impl ScanConfig {
    /// A scan of `channel_name` integrating over `nplc` cycles.
    pub fn new(nplc: i64, channel_name: impl Into<String>) -> Self {
        Self {
            nplc: Some(WireNumber::from(nplc)),
            channel_name: Some(channel_name.into()),
        }
    }

    /// Decode one `nplc,channel` record.
    pub fn decode(segment: &str) -> CodecResult<Self> {
        let tokens: Vec<&str> = segment.split(FIELD_SEPARATOR).collect();
        let &[nplc, channel_name] = tokens.as_slice() else {
            return Err(CodecError::FieldCountMismatch {
                component: Component::ScanConfig,
                layout: "ScanConfig".to_string(),
                expected: FIELD_COUNT,
                actual: tokens.len(),
            });
        };

        let nplc = if nplc.is_empty() {
            None
        } else {
            Some(WireNumber::<i64>::parse(nplc).ok_or_else(|| {
                CodecError::invalid_field(Component::ScanConfig, "nplc", nplc, "integer")
            })?)
        };
        Ok(Self {
            nplc,
            channel_name: (!channel_name.is_empty()).then(|| channel_name.to_string()),
        })
    }

    /// Encode as one record, writing numbers with their decoded spelling.
    pub fn encode(&self) -> String {
        format!(
            "{}{}{}",
            self.nplc.as_ref().map(WireNumber::token).unwrap_or_default(),
            FIELD_SEPARATOR,
            self.channel_name.as_deref().unwrap_or_default()
        )
    }
}

impl FromStr for ScanConfig {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScanConfig::decode(s)
    }
}

impl fmt::Display for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Decode a response holding one or more `;`-separated scan configurations.
pub fn decode_scan_configs(text: &str) -> CodecResult<Vec<ScanConfig>> {
    let body = text.trim_end_matches(['\r', '\n']);
    let body = body.strip_suffix(RECORD_SEPARATOR).unwrap_or(body);
    body.split(RECORD_SEPARATOR).map(ScanConfig::decode).collect()
}
