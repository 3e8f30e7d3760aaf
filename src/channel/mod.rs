//! Channel configurations.
//!
//! A channel configuration travels as one comma-separated record; several
//! records are joined with `;`. The field at index 3 is the
//! `ElectricalFunctionType` code, and it decides which layout the rest of the
//! record follows (see [`FunctionType::layout`]):
//!
//! ```text
//! REF1,1,,102,1,0,1,10,4,AM1660,1624273,291f5ef50aff4ccabb4e2a421d6fd8e0,0,0
//! ^name  ^code         ^wire count and SPRT sensor fields...
//! ```
//!
//! Only the fields a layout declares are written; a null field is an empty
//! token, never a missing one. Decoding and re-encoding reproduces the record
//! byte for byte.

/// Field layouts and the flat field set.
pub mod layout;
/// Token-preserving numbers.
pub mod number;

pub use layout::{ChannelFields, FieldId, FieldKind, FunctionType, FUNCTION_TYPE_INDEX};
pub use number::WireNumber;

use crate::error::{CodecError, CodecResult, Component};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Separates the fields of one record.
pub const FIELD_SEPARATOR: char = ',';
/// Separates records in a multi-channel response.
pub const RECORD_SEPARATOR: char = ';';

/// Identity of the physical sensor attached to a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorIdentity {
    /// Sensor model.
    pub name: Option<String>,
    /// Manufacturer serial number.
    pub serial: Option<String>,
    /// Calibration-database id of the sensor.
    pub id: Option<String>,
}

/// Cold-junction compensation settings of a thermocouple channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColdJunction {
    /// Compensation mode code.
    pub kind: Option<WireNumber<i64>>,
    /// Fixed junction temperature, used when the mode is "fixed".
    pub fixed_value: Option<WireNumber<f64>>,
    /// Channel measuring the junction, used when the mode is "channel".
    pub channel_name: Option<String>,
}

/// Free-text channel notes. Voltage and current layouts carry all three.
pub type ChannelInfo = [Option<String>; 3];

/// DC voltage measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DcVoltage {
    /// Flag open-circuit sensors.
    pub break_detection: Option<bool>,
    /// Free-text notes.
    pub channel_info: ChannelInfo,
}

/// DC current measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DcCurrent {
    /// Free-text notes.
    pub channel_info: ChannelInfo,
}

/// Plain resistance measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resistance {
    /// 2, 3 or 4 wire connection.
    pub wire_count: Option<WireNumber<i64>>,
    /// Reverse the excitation current between samples.
    pub current_commutation: Option<bool>,
    /// Flag open-circuit sensors.
    pub break_detection: Option<bool>,
}

/// Resistance measured against a reference channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResistanceRatio {
    /// 2, 3 or 4 wire connection.
    pub wire_count: Option<WireNumber<i64>>,
    /// Reverse the excitation current between samples.
    pub current_commutation: Option<bool>,
    /// Channel the ratio is taken against.
    pub reference_channel_name: Option<String>,
}

/// Frequency measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frequency {
    /// Free-text note.
    pub channel_info: Option<String>,
}

/// Platinum resistance thermometer with standard IEC 60751 coefficients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pt100 {
    /// 2, 3 or 4 wire connection.
    pub wire_count: Option<WireNumber<i64>>,
    /// Reverse the excitation current between samples.
    pub current_commutation: Option<bool>,
    /// Flag open-circuit sensors.
    pub break_detection: Option<bool>,
}

/// Platinum resistance thermometer with sensor-specific coefficients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomPrt {
    /// 2, 3 or 4 wire connection.
    pub wire_count: Option<WireNumber<i64>>,
    /// Attached sensor.
    pub sensor: SensorIdentity,
    /// Reverse the excitation current between samples.
    pub current_commutation: Option<bool>,
}

/// Standard platinum resistance thermometer (ITS-90).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sprt {
    /// 2, 3 or 4 wire connection.
    pub wire_count: Option<WireNumber<i64>>,
    /// Attached sensor.
    pub sensor: SensorIdentity,
    /// Reverse the excitation current between samples.
    pub current_commutation: Option<bool>,
    /// Flag open-circuit sensors.
    pub break_detection: Option<bool>,
}

/// NTC thermistor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thermistor {
    /// Attached sensor.
    pub sensor: SensorIdentity,
    /// Flag open-circuit sensors.
    pub break_detection: Option<bool>,
}

/// Thermocouple with a standard letter type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Thermocouple {
    /// Thermocouple letter type (`K`, `N`, `S`, ...).
    pub thermocouple_type: Option<String>,
    /// Cold-junction compensation.
    pub cold_junction: ColdJunction,
    /// Flag open-circuit sensors.
    pub break_detection: Option<bool>,
}

/// Thermocouple with a sensor-specific characteristic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomThermocouple {
    /// Attached sensor.
    pub sensor: SensorIdentity,
    /// Cold-junction compensation.
    pub cold_junction: ColdJunction,
    /// Flag open-circuit sensors.
    pub break_detection: Option<bool>,
}

/// Sensor measuring the instrument's own cold-junction block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColdJunctionReference {
    /// 2, 3 or 4 wire connection.
    pub wire_count: Option<WireNumber<i64>>,
    /// Attached sensor.
    pub sensor: SensorIdentity,
}

/// Two-wire transmitter loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transmitter {
    /// Attached sensor.
    pub sensor: SensorIdentity,
    /// Free-text note.
    pub channel_info: Option<String>,
}

/// Variant-specific part of a channel configuration, one per function type.
///
/// Each variant owns exactly the fields its layout transmits after the
/// common prefix.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelKind {
    /// Code 0.
    DcVoltage(DcVoltage),
    /// Code 1.
    DcCurrent(DcCurrent),
    /// Code 2.
    Resistance(Resistance),
    /// Code 3.
    ResistanceRatio(ResistanceRatio),
    /// Code 4.
    Frequency(Frequency),
    /// Code 100.
    Pt100(Pt100),
    /// Code 101.
    CustomPrt(CustomPrt),
    /// Code 102.
    Sprt(Sprt),
    /// Code 103.
    Thermistor(Thermistor),
    /// Code 104.
    Thermocouple(Thermocouple),
    /// Code 105.
    CustomThermocouple(CustomThermocouple),
    /// Code 106.
    ColdJunctionReference(ColdJunctionReference),
    /// Code 110.
    Transmitter(Transmitter),
}

impl ChannelKind {
    /// The discriminant written at index 3.
    pub fn function_type(&self) -> FunctionType {
        match self {
            ChannelKind::DcVoltage(_) => FunctionType::DcVoltage,
            ChannelKind::DcCurrent(_) => FunctionType::DcCurrent,
            ChannelKind::Resistance(_) => FunctionType::Resistance,
            ChannelKind::ResistanceRatio(_) => FunctionType::ResistanceRatio,
            ChannelKind::Frequency(_) => FunctionType::Frequency,
            ChannelKind::Pt100(_) => FunctionType::Pt100,
            ChannelKind::CustomPrt(_) => FunctionType::CustomPrt,
            ChannelKind::Sprt(_) => FunctionType::Sprt,
            ChannelKind::Thermistor(_) => FunctionType::Thermistor,
            ChannelKind::Thermocouple(_) => FunctionType::Thermocouple,
            ChannelKind::CustomThermocouple(_) => FunctionType::CustomThermocouple,
            ChannelKind::ColdJunctionReference(_) => FunctionType::ColdJunctionReference,
            ChannelKind::Transmitter(_) => FunctionType::Transmitter,
        }
    }

    /// The sensor identity, for variants that carry one.
    pub fn sensor(&self) -> Option<&SensorIdentity> {
        match self {
            ChannelKind::CustomPrt(v) => Some(&v.sensor),
            ChannelKind::Sprt(v) => Some(&v.sensor),
            ChannelKind::Thermistor(v) => Some(&v.sensor),
            ChannelKind::CustomThermocouple(v) => Some(&v.sensor),
            ChannelKind::ColdJunctionReference(v) => Some(&v.sensor),
            ChannelKind::Transmitter(v) => Some(&v.sensor),
            _ => None,
        }
    }

    /// Build the variant selected by `function` from a flat field set.
    fn from_fields(function: FunctionType, f: &ChannelFields) -> Self {
        let sensor = || SensorIdentity {
            name: f.sensor_name.clone(),
            serial: f.sensor_serial.clone(),
            id: f.sensor_id.clone(),
        };
        let cold_junction = || ColdJunction {
            kind: f.cold_junction_type.clone(),
            fixed_value: f.cold_junction_fixed_value.clone(),
            channel_name: f.cold_junction_channel_name.clone(),
        };
        let channel_info = || {
            [
                f.channel_info1.clone(),
                f.channel_info2.clone(),
                f.channel_info3.clone(),
            ]
        };
        let wire_count = || f.wire_count.clone();

        match function {
            FunctionType::DcVoltage => ChannelKind::DcVoltage(DcVoltage {
                break_detection: f.break_detection,
                channel_info: channel_info(),
            }),
            FunctionType::DcCurrent => ChannelKind::DcCurrent(DcCurrent {
                channel_info: channel_info(),
            }),
            FunctionType::Resistance => ChannelKind::Resistance(Resistance {
                wire_count: wire_count(),
                current_commutation: f.current_commutation,
                break_detection: f.break_detection,
            }),
            FunctionType::ResistanceRatio => ChannelKind::ResistanceRatio(ResistanceRatio {
                wire_count: wire_count(),
                current_commutation: f.current_commutation,
                reference_channel_name: f.reference_channel_name.clone(),
            }),
            FunctionType::Frequency => ChannelKind::Frequency(Frequency {
                channel_info: f.channel_info1.clone(),
            }),
            FunctionType::Pt100 => ChannelKind::Pt100(Pt100 {
                wire_count: wire_count(),
                current_commutation: f.current_commutation,
                break_detection: f.break_detection,
            }),
            FunctionType::CustomPrt => ChannelKind::CustomPrt(CustomPrt {
                wire_count: wire_count(),
                sensor: sensor(),
                current_commutation: f.current_commutation,
            }),
            FunctionType::Sprt => ChannelKind::Sprt(Sprt {
                wire_count: wire_count(),
                sensor: sensor(),
                current_commutation: f.current_commutation,
                break_detection: f.break_detection,
            }),
            FunctionType::Thermistor => ChannelKind::Thermistor(Thermistor {
                sensor: sensor(),
                break_detection: f.break_detection,
            }),
            FunctionType::Thermocouple => ChannelKind::Thermocouple(Thermocouple {
                thermocouple_type: f.thermocouple_type.clone(),
                cold_junction: cold_junction(),
                break_detection: f.break_detection,
            }),
            FunctionType::CustomThermocouple => {
                ChannelKind::CustomThermocouple(CustomThermocouple {
                    sensor: sensor(),
                    cold_junction: cold_junction(),
                    break_detection: f.break_detection,
                })
            }
            FunctionType::ColdJunctionReference => {
                ChannelKind::ColdJunctionReference(ColdJunctionReference {
                    wire_count: wire_count(),
                    sensor: sensor(),
                })
            }
            FunctionType::Transmitter => ChannelKind::Transmitter(Transmitter {
                sensor: sensor(),
                channel_info: f.channel_info1.clone(),
            }),
        }
    }

    /// Write the variant's own fields into `f`.
    fn fill_fields(&self, f: &mut ChannelFields) {
        fn put_sensor(f: &mut ChannelFields, sensor: &SensorIdentity) {
            f.sensor_name = sensor.name.clone();
            f.sensor_serial = sensor.serial.clone();
            f.sensor_id = sensor.id.clone();
        }
        fn put_cold_junction(f: &mut ChannelFields, cj: &ColdJunction) {
            f.cold_junction_type = cj.kind.clone();
            f.cold_junction_fixed_value = cj.fixed_value.clone();
            f.cold_junction_channel_name = cj.channel_name.clone();
        }
        fn put_channel_info(f: &mut ChannelFields, info: &ChannelInfo) {
            let [info1, info2, info3] = info.clone();
            f.channel_info1 = info1;
            f.channel_info2 = info2;
            f.channel_info3 = info3;
        }

        match self {
            ChannelKind::DcVoltage(v) => {
                f.break_detection = v.break_detection;
                put_channel_info(f, &v.channel_info);
            }
            ChannelKind::DcCurrent(v) => put_channel_info(f, &v.channel_info),
            ChannelKind::Resistance(v) => {
                f.wire_count = v.wire_count.clone();
                f.current_commutation = v.current_commutation;
                f.break_detection = v.break_detection;
            }
            ChannelKind::ResistanceRatio(v) => {
                f.wire_count = v.wire_count.clone();
                f.current_commutation = v.current_commutation;
                f.reference_channel_name = v.reference_channel_name.clone();
            }
            ChannelKind::Frequency(v) => f.channel_info1 = v.channel_info.clone(),
            ChannelKind::Pt100(v) => {
                f.wire_count = v.wire_count.clone();
                f.current_commutation = v.current_commutation;
                f.break_detection = v.break_detection;
            }
            ChannelKind::CustomPrt(v) => {
                f.wire_count = v.wire_count.clone();
                put_sensor(f, &v.sensor);
                f.current_commutation = v.current_commutation;
            }
            ChannelKind::Sprt(v) => {
                f.wire_count = v.wire_count.clone();
                put_sensor(f, &v.sensor);
                f.current_commutation = v.current_commutation;
                f.break_detection = v.break_detection;
            }
            ChannelKind::Thermistor(v) => {
                put_sensor(f, &v.sensor);
                f.break_detection = v.break_detection;
            }
            ChannelKind::Thermocouple(v) => {
                f.thermocouple_type = v.thermocouple_type.clone();
                put_cold_junction(f, &v.cold_junction);
                f.break_detection = v.break_detection;
            }
            ChannelKind::CustomThermocouple(v) => {
                put_sensor(f, &v.sensor);
                put_cold_junction(f, &v.cold_junction);
                f.break_detection = v.break_detection;
            }
            ChannelKind::ColdJunctionReference(v) => {
                f.wire_count = v.wire_count.clone();
                put_sensor(f, &v.sensor);
            }
            ChannelKind::Transmitter(v) => {
                put_sensor(f, &v.sensor);
                f.channel_info1 = v.channel_info.clone();
            }
        }
    }
}

/// A channel configuration.
///
/// The common prefix lives on the struct; everything after it is
/// [`ChannelKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChannelFields", into = "ChannelFields")]
pub struct ChannelConfig {
    /// Channel name; empty encodes as a null token.
    pub name: String,
    /// Whether the channel is scanned.
    pub enabled: Option<bool>,
    /// User label.
    pub label: Option<String>,
    /// Measurement range index.
    pub range_index: Option<WireNumber<i64>>,
    /// Settling delay in seconds.
    pub delay: Option<WireNumber<f64>>,
    /// Automatic range selection.
    pub auto_range: Option<bool>,
    /// Number of samples averaged per reading.
    pub filter_count: Option<WireNumber<i64>>,
    /// Variant-specific fields.
    pub kind: ChannelKind,
}

impl ChannelConfig {
    /// A configuration with every optional setting unset.
    pub fn new(name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            name: name.into(),
            enabled: None,
            label: None,
            range_index: None,
            delay: None,
            auto_range: None,
            filter_count: None,
            kind,
        }
    }

    /// Shorthand for `self.kind.function_type()`.
    pub fn function_type(&self) -> FunctionType {
        self.kind.function_type()
    }

    /// Decode one positional record.
    pub fn decode(segment: &str) -> CodecResult<Self> {
        let tokens: Vec<&str> = segment.split(FIELD_SEPARATOR).collect();
        let code_token = tokens
            .get(FUNCTION_TYPE_INDEX)
            .ok_or_else(|| CodecError::FieldCountMismatch {
                component: Component::ChannelConfig,
                layout: "ChannelConfig".to_string(),
                expected: FUNCTION_TYPE_INDEX + 1,
                actual: tokens.len(),
            })?;
        let mut discriminant = ChannelFields::default();
        discriminant.parse_field(FieldId::ElectricalFunctionType, code_token)?;
        let code = discriminant.electrical_function_type.ok_or_else(|| {
            CodecError::invalid_field(
                Component::ChannelConfig,
                FieldId::ElectricalFunctionType.name(),
                code_token,
                "integer",
            )
        })?;
        let function = FunctionType::from_code(code)?;

        let layout = function.layout();
        if tokens.len() != layout.len() {
            return Err(CodecError::FieldCountMismatch {
                component: Component::ChannelConfig,
                layout: function.name().to_string(),
                expected: layout.len(),
                actual: tokens.len(),
            });
        }

        let mut fields = ChannelFields::default();
        for (id, token) in layout.iter().zip(&tokens) {
            trace!(field = id.name(), token = *token, "channel field");
            fields.parse_field(*id, token)?;
        }
        Ok(Self::from_fields(function, fields))
    }

    /// Encode as one positional record.
    pub fn encode(&self) -> String {
        let fields = self.to_fields();
        self.function_type()
            .layout()
            .iter()
            .map(|id| fields.render_field(*id))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Flat view of the configuration. Fields the layout does not declare
    /// stay `None`.
    pub fn to_fields(&self) -> ChannelFields {
        let mut fields = ChannelFields {
            name: (!self.name.is_empty()).then(|| self.name.clone()),
            enabled: self.enabled,
            label: self.label.clone(),
            electrical_function_type: Some(self.function_type().code()),
            range_index: self.range_index.clone(),
            delay: self.delay.clone(),
            auto_range: self.auto_range,
            filter_count: self.filter_count.clone(),
            ..ChannelFields::default()
        };
        self.kind.fill_fields(&mut fields);
        fields
    }

    fn from_fields(function: FunctionType, fields: ChannelFields) -> Self {
        let kind = ChannelKind::from_fields(function, &fields);
        Self {
            name: fields.name.unwrap_or_default(),
            enabled: fields.enabled,
            label: fields.label,
            range_index: fields.range_index,
            delay: fields.delay,
            auto_range: fields.auto_range,
            filter_count: fields.filter_count,
            kind,
        }
    }
}

impl TryFrom<ChannelFields> for ChannelConfig {
    type Error = CodecError;

    fn try_from(fields: ChannelFields) -> Result<Self, Self::Error> {
        let code = fields
            .electrical_function_type
            .ok_or_else(|| {
                CodecError::invalid_field(
                    Component::ChannelConfig,
                    FieldId::ElectricalFunctionType.name(),
                    "",
                    "integer",
                )
            })?;
        let function = FunctionType::from_code(code)?;
        Ok(Self::from_fields(function, fields))
    }
}

impl From<ChannelConfig> for ChannelFields {
    fn from(config: ChannelConfig) -> Self {
        config.to_fields()
    }
}

impl FromStr for ChannelConfig {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelConfig::decode(s)
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Decode a response holding one or more `;`-separated records.
///
/// A trailing separator or line terminator is ignored.
pub fn decode_channel_configs(text: &str) -> CodecResult<Vec<ChannelConfig>> {
    let body = text.trim_end_matches(['\r', '\n']);
    let body = body.strip_suffix(RECORD_SEPARATOR).unwrap_or(body);
    let configs = body
        .split(RECORD_SEPARATOR)
        .map(ChannelConfig::decode)
        .collect::<CodecResult<Vec<_>>>()?;
    debug!(count = configs.len(), "decoded channel configurations");
    Ok(configs)
}

/// Encode several records joined with `;`, without a trailing separator.
pub fn encode_channel_configs(configs: &[ChannelConfig]) -> String {
    configs
        .iter()
        .map(ChannelConfig::encode)
        .collect::<Vec<_>>()
        .join(";")
}
