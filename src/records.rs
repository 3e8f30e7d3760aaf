//! Record types produced by the envelope decoder.

use crate::channel::ChannelConfig;
use crate::error::CodecResult;
use crate::reading::{Reading, TemperatureReading};
use crate::scan::ScanConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a digital-input module fitted to the instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DiModuleInfo {
    /// Slot the module sits in.
    pub slot: Option<i64>,
    /// Model designation, e.g. `DI8`.
    pub module_type: Option<String>,
    /// Module serial number.
    pub serial_number: Option<String>,
    /// Firmware revision string.
    pub firmware_version: Option<String>,
    /// Inputs on the module.
    pub channel_count: Option<i64>,
}

/// Every record type the registry can construct.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    /// A fitted input module.
    DiModuleInfo(DiModuleInfo),
    /// A channel configuration.
    ChannelConfig(ChannelConfig),
    /// A scan configuration.
    ScanConfig(ScanConfig),
    /// A block of samples.
    Reading(Reading),
}

impl Record {
    /// Short name of the record's type.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::DiModuleInfo(_) => "DIModuleInfo",
            Record::ChannelConfig(_) => "ChannelConfiguration",
            Record::ScanConfig(_) => "ScanConfiguration",
            Record::Reading(_) => "Reading",
        }
    }

    /// Plain JSON form of the record, without type markers.
    pub fn to_value(&self) -> CodecResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<DiModuleInfo> for Record {
    fn from(info: DiModuleInfo) -> Self {
        Record::DiModuleInfo(info)
    }
}

impl From<ChannelConfig> for Record {
    fn from(config: ChannelConfig) -> Self {
        Record::ChannelConfig(config)
    }
}

impl From<ScanConfig> for Record {
    fn from(config: ScanConfig) -> Self {
        Record::ScanConfig(config)
    }
}

impl From<Reading> for Record {
    fn from(reading: Reading) -> Self {
        Record::Reading(reading)
    }
}

impl From<TemperatureReading> for Record {
    fn from(reading: TemperatureReading) -> Self {
        Record::Reading(Reading::Temperature(reading))
    }
}
