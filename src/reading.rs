//! Streamed measurement readings.
//!
//! A reading response is a quoted, `;`-terminated list of samples for one
//! channel. Each temperature sample has nine positional fields:
//!
//! ```text
//! "REF1,OHM,1,638782167121234560,25.123456,25.123401,C,1,0.0100;REF1,OHM,1,...;"
//!  chan unit   ticks              raw       filtered  unit  temperature
//! ```
//!
//! Samples are gathered into columns (one [`Reading`] per response). Channel,
//! units and the value precision must agree across samples; they are not
//! repeated per sample in memory.
//!
//! Electrical (6 field) and thermocouple (12 field) samples use provisional
//! layouts derived from the temperature one.

use crate::config::ReadingSettings;
use crate::error::{CodecError, CodecResult, Component};
use crate::time_tag::TimeTag;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Device token for "no reading / out of range".
pub const NO_READING: &str = "------";
/// Decimal places of temperature columns unless configured otherwise.
pub const DEFAULT_TEMPERATURE_PRECISION: usize = 4;

const SAMPLE_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = ',';
const QUOTE: char = '"';
const LITERAL_ONE: &str = "1";

/// Field layout of one sample, told apart by field count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingShape {
    /// 6 fields: raw electrical value only.
    Electrical,
    /// 9 fields: adds an indicated temperature.
    Temperature,
    /// 12 fields: adds temperature and cold-junction columns.
    Thermocouple,
}

impl ReadingShape {
    /// Fields per sample of this shape.
    pub fn field_count(self) -> usize {
        match self {
            ReadingShape::Electrical => 6,
            ReadingShape::Temperature => 9,
            ReadingShape::Thermocouple => 12,
        }
    }

    /// Record type name of the shape.
    pub fn name(self) -> &'static str {
        match self {
            ReadingShape::Electrical => "ElectricalReading",
            ReadingShape::Temperature => "TemperatureReading",
            ReadingShape::Thermocouple => "ThermocoupleReading",
        }
    }

    fn from_field_count(count: usize) -> Option<Self> {
        [
            ReadingShape::Electrical,
            ReadingShape::Temperature,
            ReadingShape::Thermocouple,
        ]
        .into_iter()
        .find(|shape| shape.field_count() == count)
    }
}

/// Columns every reading carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrimaryColumns {
    /// Channel the samples belong to.
    pub channel: String,
    /// Unit of `values`, e.g. `OHM` or `V`.
    pub unit: String,
    /// Sample times.
    pub timestamps: Vec<TimeTag>,
    /// Raw values.
    pub values: Vec<f64>,
    /// Values after the instrument filter.
    pub filtered_values: Vec<f64>,
    /// Decimal places of `values` and `filtered_values` on the wire.
    pub precision: usize,
}

/// A derived quantity reported next to the primary value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecondaryColumn {
    /// Unit of the column, e.g. `C`.
    pub unit: String,
    /// Negative infinity marks samples without a reading.
    #[serde(deserialize_with = "deserialize_sentinel_values")]
    pub values: Vec<f64>,
    /// Decimal places on the wire.
    pub precision: usize,
}

/// A reading of a plain electrical channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricalReading {
    /// Columns shared by every shape.
    #[serde(flatten)]
    pub primary: PrimaryColumns,
}

/// A reading of a resistance thermometer or thermistor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemperatureReading {
    /// Columns shared by every shape.
    #[serde(flatten)]
    pub primary: PrimaryColumns,
    /// Indicated temperature.
    pub temperature: SecondaryColumn,
}

/// A reading of a thermocouple channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ThermocoupleReading {
    /// Columns shared by every shape.
    #[serde(flatten)]
    pub primary: PrimaryColumns,
    /// Indicated temperature.
    pub temperature: SecondaryColumn,
    /// Cold-junction temperature.
    pub cold_junction: SecondaryColumn,
}

/// All samples of one channel from a single response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    /// Six-field samples.
    Electrical(ElectricalReading),
    /// Nine-field samples.
    Temperature(TemperatureReading),
    /// Twelve-field samples.
    Thermocouple(ThermocoupleReading),
}

impl Reading {
    /// Decode with the default temperature precision.
    pub fn decode(text: &str) -> CodecResult<Self> {
        ReadingDecoder::default().decode(text)
    }

    /// Which sample layout the reading came from.
    pub fn shape(&self) -> ReadingShape {
        match self {
            Reading::Electrical(_) => ReadingShape::Electrical,
            Reading::Temperature(_) => ReadingShape::Temperature,
            Reading::Thermocouple(_) => ReadingShape::Thermocouple,
        }
    }

    /// Columns shared by every shape.
    pub fn primary(&self) -> &PrimaryColumns {
        match self {
            Reading::Electrical(r) => &r.primary,
            Reading::Temperature(r) => &r.primary,
            Reading::Thermocouple(r) => &r.primary,
        }
    }

    /// Channel name of every sample.
    pub fn channel(&self) -> &str {
        &self.primary().channel
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.primary().timestamps.len()
    }

    /// True when the reading holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Temperature column, absent for electrical readings.
    pub fn temperature(&self) -> Option<&SecondaryColumn> {
        match self {
            Reading::Electrical(_) => None,
            Reading::Temperature(r) => Some(&r.temperature),
            Reading::Thermocouple(r) => Some(&r.temperature),
        }
    }

    /// Cold-junction column of a thermocouple reading.
    pub fn cold_junction(&self) -> Option<&SecondaryColumn> {
        match self {
            Reading::Thermocouple(r) => Some(&r.cold_junction),
            _ => None,
        }
    }

    /// Re-render in wire form: `"sample;sample;...;"`.
    pub fn encode(&self) -> CodecResult<String> {
        let primary = self.primary();
        let count = primary.timestamps.len();
        let secondary: Vec<&SecondaryColumn> =
            self.temperature().into_iter().chain(self.cold_junction()).collect();

        check_column(primary, "values", primary.values.len(), count)?;
        check_column(primary, "filtered values", primary.filtered_values.len(), count)?;
        for column in &secondary {
            check_column(primary, "secondary values", column.values.len(), count)?;
        }

        let mut samples = Vec::with_capacity(count);
        for i in 0..count {
            let mut fields = vec![
                primary.channel.clone(),
                primary.unit.clone(),
                LITERAL_ONE.to_string(),
                primary.timestamps[i].to_ticks().to_string(),
                format_fixed(primary.values[i], primary.precision),
                format_fixed(primary.filtered_values[i], primary.precision),
            ];
            for column in &secondary {
                fields.push(column.unit.clone());
                fields.push(LITERAL_ONE.to_string());
                fields.push(format_secondary(column.values[i], column.precision));
            }
            samples.push(fields.join(","));
        }
        Ok(format!("{QUOTE}{}{SAMPLE_SEPARATOR}{QUOTE}", samples.join(";")))
    }
}

/// Decodes reading responses into columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingDecoder {
    temperature_precision: usize,
}

impl Default for ReadingDecoder {
    fn default() -> Self {
        Self {
            temperature_precision: DEFAULT_TEMPERATURE_PRECISION,
        }
    }
}

impl ReadingDecoder {
    /// Decoder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder configured from `settings`.
    pub fn with_settings(settings: &ReadingSettings) -> Self {
        Self::new().with_temperature_precision(settings.temperature_precision)
    }

    /// Decimal places used when re-encoding temperature columns.
    pub fn with_temperature_precision(mut self, precision: usize) -> Self {
        self.temperature_precision = precision;
        self
    }

    /// Decode a quoted `sample;sample;...;` response.
    pub fn decode(&self, text: &str) -> CodecResult<Reading> {
        let body = strip_payload(text);
        let samples: Vec<Vec<&str>> = body
            .split(SAMPLE_SEPARATOR)
            .map(|sample| sample.split(FIELD_SEPARATOR).collect())
            .collect();

        let first = match samples.first() {
            Some(first) if !body.is_empty() => first,
            _ => {
                return Err(mismatch(
                    "Reading",
                    ReadingShape::Temperature.field_count(),
                    0,
                ))
            }
        };
        let shape = ReadingShape::from_field_count(first.len()).ok_or_else(|| {
            mismatch("Reading", ReadingShape::Temperature.field_count(), first.len())
        })?;
        if let Some(bad) = samples.iter().find(|s| s.len() != shape.field_count()) {
            return Err(mismatch(shape.name(), shape.field_count(), bad.len()));
        }

        let channel = first[0];
        let unit = first[1];
        let precision = decimals(first[4]);
        let mut primary = PrimaryColumns {
            channel: channel.to_string(),
            unit: unit.to_string(),
            timestamps: Vec::with_capacity(samples.len()),
            values: Vec::with_capacity(samples.len()),
            filtered_values: Vec::with_capacity(samples.len()),
            precision,
        };
        let mut temperature = (shape != ReadingShape::Electrical)
            .then(|| self.secondary_column(first[6], samples.len()));
        let mut cold_junction = (shape == ReadingShape::Thermocouple)
            .then(|| self.secondary_column(first[9], samples.len()));

        for fields in &samples {
            check_same(channel, "channel name", channel, fields[0])?;
            check_same(channel, "unit", unit, fields[1])?;
            expect_literal(fields[2])?;
            primary.timestamps.push(TimeTag::parse(fields[3])?);
            check_same(
                channel,
                "precision",
                &precision.to_string(),
                &decimals(fields[4]).to_string(),
            )?;
            primary.values.push(parse_value("value", fields[4])?);
            primary
                .filtered_values
                .push(parse_value("filtered value", fields[5])?);

            if let Some(column) = temperature.as_mut() {
                push_secondary(channel, "temperature unit", column, &fields[6..9])?;
            }
            if let Some(column) = cold_junction.as_mut() {
                push_secondary(channel, "cold junction unit", column, &fields[9..12])?;
            }
        }

        debug!(
            channel = channel,
            samples = samples.len(),
            shape = shape.name(),
            "decoded reading"
        );

        let reading = match (temperature, cold_junction) {
            (Some(temperature), Some(cold_junction)) => Reading::Thermocouple(ThermocoupleReading {
                primary,
                temperature,
                cold_junction,
            }),
            (Some(temperature), None) => {
                Reading::Temperature(TemperatureReading { primary, temperature })
            }
            _ => Reading::Electrical(ElectricalReading { primary }),
        };
        Ok(reading)
    }

    fn secondary_column(&self, unit: &str, capacity: usize) -> SecondaryColumn {
        SecondaryColumn {
            unit: unit.to_string(),
            values: Vec::with_capacity(capacity),
            precision: self.temperature_precision,
        }
    }
}

/// Decode with the default temperature precision.
pub fn decode_reading(text: &str) -> CodecResult<Reading> {
    Reading::decode(text)
}

fn strip_payload(text: &str) -> &str {
    let body = text.trim();
    let body = body.strip_prefix(QUOTE).unwrap_or(body);
    let body = body.strip_suffix(QUOTE).unwrap_or(body);
    body.strip_suffix(SAMPLE_SEPARATOR).unwrap_or(body)
}

/// Digits after the decimal point.
fn decimals(token: &str) -> usize {
    token
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

fn mismatch(layout: &str, expected: usize, actual: usize) -> CodecError {
    CodecError::FieldCountMismatch {
        component: Component::Reading,
        layout: layout.to_string(),
        expected,
        actual,
    }
}

fn check_same(channel: &str, field: &'static str, expected: &str, actual: &str) -> CodecResult<()> {
    if expected == actual {
        return Ok(());
    }
    Err(CodecError::InconsistentSampleMetadata {
        channel: channel.to_string(),
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

fn check_column(
    primary: &PrimaryColumns,
    column: &str,
    actual: usize,
    expected: usize,
) -> CodecResult<()> {
    if actual == expected {
        return Ok(());
    }
    Err(mismatch(
        &format!("{} {column}", primary.channel),
        expected,
        actual,
    ))
}

fn expect_literal(token: &str) -> CodecResult<()> {
    if token == LITERAL_ONE {
        Ok(())
    } else {
        Err(CodecError::invalid_field(
            Component::Reading,
            "literal",
            token,
            "literal '1'",
        ))
    }
}

fn parse_value(field: &'static str, token: &str) -> CodecResult<f64> {
    token
        .parse()
        .map_err(|_| CodecError::invalid_field(Component::Reading, field, token, "number"))
}

fn push_secondary(
    channel: &str,
    field: &'static str,
    column: &mut SecondaryColumn,
    fields: &[&str],
) -> CodecResult<()> {
    let &[unit, literal, value] = fields else {
        return Err(mismatch(field, 3, fields.len()));
    };
    check_same(channel, field, &column.unit, unit)?;
    expect_literal(literal)?;
    let value = if value == NO_READING {
        f64::NEG_INFINITY
    } else {
        parse_value("secondary value", value)?
    };
    column.values.push(value);
    Ok(())
}

fn format_fixed(value: f64, precision: usize) -> String {
    format!("{value:.precision$}")
}

fn format_secondary(value: f64, precision: usize) -> String {
    if value == f64::NEG_INFINITY {
        NO_READING.to_string()
    } else {
        format_fixed(value, precision)
    }
}

fn deserialize_sentinel_values<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| value.unwrap_or(f64::NEG_INFINITY))
        .collect())
}
