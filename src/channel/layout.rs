//! Positional field layouts of channel configurations.
//!
//! Every layout starts with the same eight fields; the `ElectricalFunctionType`
//! discriminant at index 3 selects which extra fields follow.

use super::number::WireNumber;
use crate::error::{CodecError, CodecResult, Component};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of the discriminant in every layout.
pub const FUNCTION_TYPE_INDEX: usize = 3;

/// Primitive type of a positional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `1` or `0`.
    Bool,
    /// Signed decimal integer.
    Int,
    /// Finite decimal number.
    Float,
    /// Free text; empty means null.
    Text,
}

impl FieldKind {
    fn describe(self) -> &'static str {
        match self {
            FieldKind::Bool => "boolean (1/0)",
            FieldKind::Int => "integer",
            FieldKind::Float => "finite number",
            FieldKind::Text => "string",
        }
    }
}

/// A positional field. Each variant maps to one [`ChannelFields`] member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    /// Channel name, e.g. `REF1`.
    Name,
    /// Whether the channel is scanned.
    Enabled,
    /// User label.
    Label,
    /// The layout discriminant.
    ElectricalFunctionType,
    /// Measurement range index.
    RangeIndex,
    /// Settling delay in seconds.
    Delay,
    /// Automatic range selection.
    AutoRange,
    /// Samples averaged per reading.
    FilterCount,
    /// Reverse the excitation current between samples.
    CurrentCommutation,
    /// First free-text note.
    ChannelInfo1,
    /// Second free-text note.
    ChannelInfo2,
    /// Third free-text note.
    ChannelInfo3,
    /// 2, 3 or 4 wire connection.
    WireCount,
    /// Sensor model.
    SensorName,
    /// Sensor serial number.
    SensorSerial,
    /// Sensor database id.
    SensorId,
    /// Open-circuit detection.
    BreakDetection,
    /// Reference channel of a ratio measurement.
    ReferenceChannelName,
    /// Thermocouple letter type.
    ThermocoupleType,
    /// Cold-junction compensation mode.
    ColdJunctionType,
    /// Fixed cold-junction temperature.
    ColdJunctionFixedValue,
    /// Channel measuring the cold junction.
    ColdJunctionChannelName,
}

impl FieldId {
    /// Field name used in errors and logs.
    pub fn name(self) -> &'static str {
        match self {
            FieldId::Name => "name",
            FieldId::Enabled => "enabled",
            FieldId::Label => "label",
            FieldId::ElectricalFunctionType => "electrical_function_type",
            FieldId::RangeIndex => "range_index",
            FieldId::Delay => "delay",
            FieldId::AutoRange => "auto_range",
            FieldId::FilterCount => "filter_count",
            FieldId::CurrentCommutation => "current_commutation",
            FieldId::ChannelInfo1 => "channel_info_1",
            FieldId::ChannelInfo2 => "channel_info_2",
            FieldId::ChannelInfo3 => "channel_info_3",
            FieldId::WireCount => "wire_count",
            FieldId::SensorName => "sensor_name",
            FieldId::SensorSerial => "sensor_serial",
            FieldId::SensorId => "sensor_id",
            FieldId::BreakDetection => "break_detection",
            FieldId::ReferenceChannelName => "reference_channel_name",
            FieldId::ThermocoupleType => "thermocouple_type",
            FieldId::ColdJunctionType => "cold_junction_type",
            FieldId::ColdJunctionFixedValue => "cold_junction_fixed_value",
            FieldId::ColdJunctionChannelName => "cold_junction_channel_name",
        }
    }

    /// Primitive type of the field's token.
    pub fn kind(self) -> FieldKind {
        match self {
            FieldId::Enabled
            | FieldId::AutoRange
            | FieldId::CurrentCommutation
            | FieldId::BreakDetection => FieldKind::Bool,
            FieldId::ElectricalFunctionType
            | FieldId::RangeIndex
            | FieldId::FilterCount
            | FieldId::WireCount
            | FieldId::ColdJunctionType => FieldKind::Int,
            FieldId::Delay | FieldId::ColdJunctionFixedValue => FieldKind::Float,
            FieldId::Name
            | FieldId::Label
            | FieldId::ChannelInfo1
            | FieldId::ChannelInfo2
            | FieldId::ChannelInfo3
            | FieldId::SensorName
            | FieldId::SensorSerial
            | FieldId::SensorId
            | FieldId::ReferenceChannelName
            | FieldId::ThermocoupleType
            | FieldId::ColdJunctionChannelName => FieldKind::Text,
        }
    }
}

use FieldId::*;

const COMMON: [FieldId; 8] = [
    Name,
    Enabled,
    Label,
    ElectricalFunctionType,
    RangeIndex,
    Delay,
    AutoRange,
    FilterCount,
];

const DC_VOLTAGE: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    BreakDetection, ChannelInfo1, ChannelInfo2, ChannelInfo3,
];
const DC_CURRENT: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    ChannelInfo1, ChannelInfo2, ChannelInfo3,
];
const RESISTANCE: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    WireCount, CurrentCommutation, BreakDetection,
];
const RESISTANCE_RATIO: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    WireCount, CurrentCommutation, ReferenceChannelName,
];
const FREQUENCY: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    ChannelInfo1,
];
const PT100: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    WireCount, CurrentCommutation, BreakDetection,
];
const CUSTOM_PRT: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    WireCount, SensorName, SensorSerial, SensorId, CurrentCommutation,
];
const SPRT: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    WireCount, SensorName, SensorSerial, SensorId, CurrentCommutation, BreakDetection,
];
const THERMISTOR: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    SensorName, SensorSerial, SensorId, BreakDetection,
];
const THERMOCOUPLE: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    ThermocoupleType, ColdJunctionType, ColdJunctionFixedValue, ColdJunctionChannelName,
    BreakDetection,
];
const CUSTOM_THERMOCOUPLE: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    SensorName, SensorSerial, SensorId, ColdJunctionType, ColdJunctionFixedValue,
    ColdJunctionChannelName, BreakDetection,
];
const COLD_JUNCTION_REFERENCE: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    WireCount, SensorName, SensorSerial, SensorId,
];
const TRANSMITTER: &[FieldId] = &[
    Name, Enabled, Label, ElectricalFunctionType, RangeIndex, Delay, AutoRange, FilterCount,
    SensorName, SensorSerial, SensorId, ChannelInfo1,
];

/// The `ElectricalFunctionType` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionType {
    /// Code 0.
    DcVoltage,
    /// Code 1.
    DcCurrent,
    /// Code 2.
    Resistance,
    /// Code 3.
    ResistanceRatio,
    /// Code 4.
    Frequency,
    /// Code 100.
    Pt100,
    /// Code 101.
    CustomPrt,
    /// Code 102.
    Sprt,
    /// Code 103.
    Thermistor,
    /// Code 104.
    Thermocouple,
    /// Code 105.
    CustomThermocouple,
    /// Code 106.
    ColdJunctionReference,
    /// Code 110.
    Transmitter,
}

impl FunctionType {
    /// Every supported function type, in code order.
    pub const ALL: [FunctionType; 13] = [
        FunctionType::DcVoltage,
        FunctionType::DcCurrent,
        FunctionType::Resistance,
        FunctionType::ResistanceRatio,
        FunctionType::Frequency,
        FunctionType::Pt100,
        FunctionType::CustomPrt,
        FunctionType::Sprt,
        FunctionType::Thermistor,
        FunctionType::Thermocouple,
        FunctionType::CustomThermocouple,
        FunctionType::ColdJunctionReference,
        FunctionType::Transmitter,
    ];

    /// Wire value of the discriminant.
    pub fn code(self) -> i64 {
        match self {
            FunctionType::DcVoltage => 0,
            FunctionType::DcCurrent => 1,
            FunctionType::Resistance => 2,
            FunctionType::ResistanceRatio => 3,
            FunctionType::Frequency => 4,
            FunctionType::Pt100 => 100,
            FunctionType::CustomPrt => 101,
            FunctionType::Sprt => 102,
            FunctionType::Thermistor => 103,
            FunctionType::Thermocouple => 104,
            FunctionType::CustomThermocouple => 105,
            FunctionType::ColdJunctionReference => 106,
            FunctionType::Transmitter => 110,
        }
    }

    /// Look up a discriminant, failing with [`CodecError::UnsupportedDiscriminant`].
    pub fn from_code(code: i64) -> CodecResult<Self> {
        Self::ALL
            .into_iter()
            .find(|function| function.code() == code)
            .ok_or(CodecError::UnsupportedDiscriminant { code })
    }

    /// Variant name, as used in field-count errors.
    pub fn name(self) -> &'static str {
        match self {
            FunctionType::DcVoltage => "DcVoltage",
            FunctionType::DcCurrent => "DcCurrent",
            FunctionType::Resistance => "Resistance",
            FunctionType::ResistanceRatio => "ResistanceRatio",
            FunctionType::Frequency => "Frequency",
            FunctionType::Pt100 => "Pt100",
            FunctionType::CustomPrt => "CustomPrt",
            FunctionType::Sprt => "Sprt",
            FunctionType::Thermistor => "Thermistor",
            FunctionType::Thermocouple => "Thermocouple",
            FunctionType::CustomThermocouple => "CustomThermocouple",
            FunctionType::ColdJunctionReference => "ColdJunctionReference",
            FunctionType::Transmitter => "Transmitter",
        }
    }

    /// Ordered positional fields of this variant, common fields included.
    pub fn layout(self) -> &'static [FieldId] {
        match self {
            FunctionType::DcVoltage => DC_VOLTAGE,
            FunctionType::DcCurrent => DC_CURRENT,
            FunctionType::Resistance => RESISTANCE,
            FunctionType::ResistanceRatio => RESISTANCE_RATIO,
            FunctionType::Frequency => FREQUENCY,
            FunctionType::Pt100 => PT100,
            FunctionType::CustomPrt => CUSTOM_PRT,
            FunctionType::Sprt => SPRT,
            FunctionType::Thermistor => THERMISTOR,
            FunctionType::Thermocouple => THERMOCOUPLE,
            FunctionType::CustomThermocouple => CUSTOM_THERMOCOUPLE,
            FunctionType::ColdJunctionReference => COLD_JUNCTION_REFERENCE,
            FunctionType::Transmitter => TRANSMITTER,
        }
    }

    /// Fields this variant adds after the common prefix.
    pub fn extra_fields(self) -> &'static [FieldId] {
        &self.layout()[COMMON.len()..]
    }

    /// Number of tokens in a record of this type.
    pub fn field_count(self) -> usize {
        self.layout().len()
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Flat view of a channel configuration: every field any layout can carry.
///
/// This is both the intermediate form of the positional codec and the JSON
/// shape of a `ChannelConfiguration` envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ChannelFields {
    /// See [`FieldId::Name`].
    pub name: Option<String>,
    /// See [`FieldId::Enabled`].
    pub enabled: Option<bool>,
    /// See [`FieldId::Label`].
    pub label: Option<String>,
    /// Function type code; always written in canonical form.
    pub electrical_function_type: Option<i64>,
    /// See [`FieldId::RangeIndex`].
    pub range_index: Option<WireNumber<i64>>,
    /// See [`FieldId::Delay`].
    pub delay: Option<WireNumber<f64>>,
    /// See [`FieldId::AutoRange`].
    pub auto_range: Option<bool>,
    /// See [`FieldId::FilterCount`].
    pub filter_count: Option<WireNumber<i64>>,
    /// See [`FieldId::CurrentCommutation`].
    pub current_commutation: Option<bool>,
    /// See [`FieldId::ChannelInfo1`].
    pub channel_info1: Option<String>,
    /// See [`FieldId::ChannelInfo2`].
    pub channel_info2: Option<String>,
    /// See [`FieldId::ChannelInfo3`].
    pub channel_info3: Option<String>,
    /// See [`FieldId::WireCount`].
    pub wire_count: Option<WireNumber<i64>>,
    /// See [`FieldId::SensorName`].
    pub sensor_name: Option<String>,
    /// See [`FieldId::SensorSerial`].
    pub sensor_serial: Option<String>,
    /// See [`FieldId::SensorId`].
    pub sensor_id: Option<String>,
    /// See [`FieldId::BreakDetection`].
    pub break_detection: Option<bool>,
    /// See [`FieldId::ReferenceChannelName`].
    pub reference_channel_name: Option<String>,
    /// See [`FieldId::ThermocoupleType`].
    pub thermocouple_type: Option<String>,
    /// See [`FieldId::ColdJunctionType`].
    pub cold_junction_type: Option<WireNumber<i64>>,
    /// See [`FieldId::ColdJunctionFixedValue`].
    pub cold_junction_fixed_value: Option<WireNumber<f64>>,
    /// See [`FieldId::ColdJunctionChannelName`].
    pub cold_junction_channel_name: Option<String>,
}

enum SlotMut<'a> {
    Bool(&'a mut Option<bool>),
    Code(&'a mut Option<i64>),
    Int(&'a mut Option<WireNumber<i64>>),
    Float(&'a mut Option<WireNumber<f64>>),
    Text(&'a mut Option<String>),
}

impl ChannelFields {
    /// Parse `token` as field `id` and store it.
    pub fn parse_field(&mut self, id: FieldId, token: &str) -> CodecResult<()> {
        match self.slot(id) {
            SlotMut::Bool(slot) => *slot = parse_bool(id, token)?,
            SlotMut::Code(slot) => *slot = parse_code(id, token)?,
            SlotMut::Int(slot) => *slot = parse_int(id, token)?,
            SlotMut::Float(slot) => *slot = parse_float(id, token)?,
            SlotMut::Text(slot) => *slot = parse_text(token),
        }
        Ok(())
    }

    /// Wire token of field `id`; empty when the field is null.
    pub fn render_field(&self, id: FieldId) -> String {
        match id {
            Enabled => render_bool(self.enabled),
            AutoRange => render_bool(self.auto_range),
            CurrentCommutation => render_bool(self.current_commutation),
            BreakDetection => render_bool(self.break_detection),
            ElectricalFunctionType => self
                .electrical_function_type
                .map(|code| code.to_string())
                .unwrap_or_default(),
            RangeIndex => render_number(&self.range_index),
            FilterCount => render_number(&self.filter_count),
            WireCount => render_number(&self.wire_count),
            ColdJunctionType => render_number(&self.cold_junction_type),
            Delay => render_number(&self.delay),
            ColdJunctionFixedValue => render_number(&self.cold_junction_fixed_value),
            Name => render_text(&self.name),
            Label => render_text(&self.label),
            ChannelInfo1 => render_text(&self.channel_info1),
            ChannelInfo2 => render_text(&self.channel_info2),
            ChannelInfo3 => render_text(&self.channel_info3),
            SensorName => render_text(&self.sensor_name),
            SensorSerial => render_text(&self.sensor_serial),
            SensorId => render_text(&self.sensor_id),
            ReferenceChannelName => render_text(&self.reference_channel_name),
            ThermocoupleType => render_text(&self.thermocouple_type),
            ColdJunctionChannelName => render_text(&self.cold_junction_channel_name),
        }
    }

    fn slot(&mut self, id: FieldId) -> SlotMut<'_> {
        match id {
            Enabled => SlotMut::Bool(&mut self.enabled),
            AutoRange => SlotMut::Bool(&mut self.auto_range),
            CurrentCommutation => SlotMut::Bool(&mut self.current_commutation),
            BreakDetection => SlotMut::Bool(&mut self.break_detection),
            ElectricalFunctionType => SlotMut::Code(&mut self.electrical_function_type),
            RangeIndex => SlotMut::Int(&mut self.range_index),
            FilterCount => SlotMut::Int(&mut self.filter_count),
            WireCount => SlotMut::Int(&mut self.wire_count),
            ColdJunctionType => SlotMut::Int(&mut self.cold_junction_type),
            Delay => SlotMut::Float(&mut self.delay),
            ColdJunctionFixedValue => SlotMut::Float(&mut self.cold_junction_fixed_value),
            Name => SlotMut::Text(&mut self.name),
            Label => SlotMut::Text(&mut self.label),
            ChannelInfo1 => SlotMut::Text(&mut self.channel_info1),
            ChannelInfo2 => SlotMut::Text(&mut self.channel_info2),
            ChannelInfo3 => SlotMut::Text(&mut self.channel_info3),
            SensorName => SlotMut::Text(&mut self.sensor_name),
            SensorSerial => SlotMut::Text(&mut self.sensor_serial),
            SensorId => SlotMut::Text(&mut self.sensor_id),
            ReferenceChannelName => SlotMut::Text(&mut self.reference_channel_name),
            ThermocoupleType => SlotMut::Text(&mut self.thermocouple_type),
            ColdJunctionChannelName => SlotMut::Text(&mut self.cold_junction_channel_name),
        }
    }
}

fn render_bool(value: Option<bool>) -> String {
    match value {
        Some(true) => "1".to_string(),
        Some(false) => "0".to_string(),
        None => String::new(),
    }
}

fn render_number<T>(value: &Option<WireNumber<T>>) -> String {
    value
        .as_ref()
        .map(|number| number.token().to_string())
        .unwrap_or_default()
}

fn render_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn invalid(id: FieldId, token: &str) -> CodecError {
    CodecError::invalid_field(Component::ChannelConfig, id.name(), token, id.kind().describe())
}

fn parse_bool(id: FieldId, token: &str) -> CodecResult<Option<bool>> {
    match token {
        "" => Ok(None),
        "1" => Ok(Some(true)),
        "0" => Ok(Some(false)),
        _ => Err(invalid(id, token)),
    }
}

/// The discriminant is re-rendered from the variant, so only its canonical
/// spelling is accepted.
fn parse_code(id: FieldId, token: &str) -> CodecResult<Option<i64>> {
    if token.is_empty() {
        return Ok(None);
    }
    match token.parse::<i64>() {
        Ok(code) if code.to_string() == token => Ok(Some(code)),
        _ => Err(invalid(id, token)),
    }
}

fn parse_int(id: FieldId, token: &str) -> CodecResult<Option<WireNumber<i64>>> {
    if token.is_empty() {
        return Ok(None);
    }
    WireNumber::<i64>::parse(token)
        .map(Some)
        .ok_or_else(|| invalid(id, token))
}

fn parse_float(id: FieldId, token: &str) -> CodecResult<Option<WireNumber<f64>>> {
    if token.is_empty() {
        return Ok(None);
    }
    WireNumber::<f64>::parse(token)
        .map(Some)
        .ok_or_else(|| invalid(id, token))
}

fn parse_text(token: &str) -> Option<String> {
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_layouts_share_common_prefix() {
        for function in FunctionType::ALL {
            let layout = function.layout();
            assert_eq!(&layout[..COMMON.len()], &COMMON[..], "{function}");
            assert_eq!(layout[FUNCTION_TYPE_INDEX], FieldId::ElectricalFunctionType);
        }
    }

    #[test]
    fn test_codes_are_distinct_and_round_trip() {
        for function in FunctionType::ALL {
            assert_eq!(FunctionType::from_code(function.code()).unwrap(), function);
        }
        let mut codes: Vec<i64> = FunctionType::ALL.iter().map(|f| f.code()).collect();
        codes.dedup();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 100, 101, 102, 103, 104, 105, 106, 110]);
    }

    #[test]
    fn test_unsupported_code() {
        for code in [-1, 5, 99, 107, 111, 1000] {
            assert!(matches!(
                FunctionType::from_code(code),
                Err(CodecError::UnsupportedDiscriminant { code: c }) if c == code
            ));
        }
    }

    #[test]
    fn test_sprt_field_count() {
        assert_eq!(FunctionType::Sprt.field_count(), 14);
        assert_eq!(
            FunctionType::Sprt.extra_fields(),
            &[
                FieldId::WireCount,
                FieldId::SensorName,
                FieldId::SensorSerial,
                FieldId::SensorId,
                FieldId::CurrentCommutation,
                FieldId::BreakDetection,
            ]
        );
    }

    #[test]
    fn test_bool_fields_reject_other_tokens() {
        let mut fields = ChannelFields::default();
        assert!(fields.parse_field(FieldId::Enabled, "1").is_ok());
        assert_eq!(fields.enabled, Some(true));
        match fields.parse_field(FieldId::Enabled, "true") {
            Err(CodecError::InvalidField { field, token, .. }) => {
                assert_eq!(field, "enabled");
                assert_eq!(token, "true");
            }
            other => panic!("expected InvalidField, got {other:?}"),
        }
    }

    #[test]
    fn test_number_tokens_render_verbatim() {
        let mut fields = ChannelFields::default();
        for (id, token) in [
            (FieldId::Delay, "0.50"),
            (FieldId::Delay, "1.0"),
            (FieldId::RangeIndex, "05"),
            (FieldId::FilterCount, "+10"),
            (FieldId::ColdJunctionFixedValue, "-0.000"),
        ] {
            fields.parse_field(id, token).unwrap();
            assert_eq!(fields.render_field(id), token);
        }
        assert_eq!(fields.delay.as_ref().map(WireNumber::value), Some(1.0));
    }

    #[test]
    fn test_non_finite_and_odd_codes_rejected() {
        let mut fields = ChannelFields::default();
        for token in ["nan", "inf", "-inf", "NaN"] {
            assert!(matches!(
                fields.parse_field(FieldId::Delay, token),
                Err(CodecError::InvalidField { field: "delay", .. })
            ));
        }
        for token in ["0102", "+102"] {
            assert!(fields
                .parse_field(FieldId::ElectricalFunctionType, token)
                .is_err());
        }
    }

    #[test]
    fn test_empty_token_is_null_and_renders_empty() {
        let mut fields = ChannelFields::default();
        for id in FunctionType::CustomThermocouple.layout() {
            fields.parse_field(*id, "").unwrap();
            assert_eq!(fields.render_field(*id), "");
        }
        assert_eq!(fields, ChannelFields::default());
    }
}
