//! Instrument timestamps.
//!
//! The instrument reports time in three textual forms:
//!
//! - ISO-like: `"2025-03-22 14:05:12 123456"`
//! - SCPI-like: `"2025:03:22 14:05:12 123456"`
//! - raw ticks: `"638782167121234560"` (100 ns units since 0001-01-01 00:00:00)
//!
//! [`TimeTag`] accepts all three and always converts back to ticks, which is
//! the form the device expects in command arguments. Only instants between
//! 0001-01-01 00:00:00 and 9999-12-31 23:59:59.9999999 have a tick count, so
//! anything outside that range is rejected at parse time.

use crate::error::{CodecError, CodecResult};
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ticks per second (one tick is 100 ns).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks between 0001-01-01 and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Tick count of 9999-12-31 23:59:59.9999999.
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

const ISO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SCPI_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const MAX_FRACTION_DIGITS: usize = 7;

/// An instant as reported by the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeTag(NaiveDateTime);

impl TimeTag {
    /// Parse any of the three textual forms.
    ///
    /// The ISO form is tried first, then the SCPI form, and finally the token
    /// is read as an integer tick count.
    pub fn parse(text: &str) -> CodecResult<Self> {
        let token = text.trim();
        if let Some(tag) = Self::parse_calendar(token, ISO_FORMAT) {
            return Ok(tag);
        }
        if let Some(tag) = Self::parse_calendar(token, SCPI_FORMAT) {
            return Ok(tag);
        }
        let ticks = token.parse::<i64>().map_err(|_| CodecError::MalformedTimestamp {
            token: token.to_string(),
        })?;
        Self::from_ticks(ticks)
    }

    /// Build a tag from a tick count.
    pub fn from_ticks(ticks: i64) -> CodecResult<Self> {
        let malformed = || CodecError::MalformedTimestamp {
            token: ticks.to_string(),
        };
        if !(0..=MAX_TICKS).contains(&ticks) {
            return Err(malformed());
        }
        let offset = ticks - UNIX_EPOCH_TICKS;
        let secs = offset.div_euclid(TICKS_PER_SECOND);
        let nanos = (offset.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        DateTime::from_timestamp(secs, nanos)
            .map(|dt| TimeTag(dt.naive_utc()))
            .ok_or_else(malformed)
    }

    /// Wrap a chrono datetime. Precision beyond one tick is dropped.
    ///
    /// Fails for datetimes outside the tick range and for leap seconds.
    pub fn from_datetime(datetime: NaiveDateTime) -> CodecResult<Self> {
        let nanos = datetime.nanosecond();
        datetime
            .with_nanosecond(nanos - nanos % 100)
            .and_then(Self::within_range)
            .ok_or_else(|| CodecError::MalformedTimestamp {
                token: datetime.to_string(),
            })
    }

    /// The wrapped chrono datetime.
    pub fn as_datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Tick count, regardless of which form the tag was parsed from.
    ///
    /// Every constructor enforces the tick range, so this cannot overflow.
    pub fn to_ticks(&self) -> i64 {
        let dt = self.0.and_utc();
        dt.timestamp() * TICKS_PER_SECOND
            + i64::from(dt.timestamp_subsec_nanos() / 100)
            + UNIX_EPOCH_TICKS
    }

    /// SCPI-colon form truncated to milliseconds, e.g. `2025:03:22 14:05:12 123`.
    pub fn to_short_form(&self) -> String {
        format!(
            "{} {:03}",
            self.0.format(SCPI_FORMAT),
            self.0.nanosecond() / 1_000_000
        )
    }

    /// ISO-dashed form with microseconds, e.g. `2025-03-22 14:05:12 123456`.
    pub fn to_iso_form(&self) -> String {
        format!(
            "{} {:06}",
            self.0.format(ISO_FORMAT),
            self.0.nanosecond() / 1_000
        )
    }

    fn parse_calendar(token: &str, format: &str) -> Option<Self> {
        if let Some((head, fraction)) = token.rsplit_once(' ') {
            if let Some(nanos) = fraction_to_nanos(fraction) {
                let base = NaiveDateTime::parse_from_str(head, format).ok()?;
                return base.with_nanosecond(nanos).and_then(Self::within_range);
            }
        }
        NaiveDateTime::parse_from_str(token, format)
            .ok()
            .and_then(Self::within_range)
    }

    fn within_range(datetime: NaiveDateTime) -> Option<Self> {
        let in_years = (1..=9999).contains(&datetime.year());
        (in_years && datetime.nanosecond() < 1_000_000_000).then_some(TimeTag(datetime))
    }
}

/// Interpret `digits` as a decimal fraction of a second.
fn fraction_to_nanos(digits: &str) -> Option<u32> {
    if digits.is_empty()
        || digits.len() > MAX_FRACTION_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    Some(value * 10u32.pow(9 - digits.len() as u32))
}

impl fmt::Display for TimeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_form())
    }
}

impl FromStr for TimeTag {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeTag::parse(s)
    }
}

impl Serialize for TimeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.to_ticks())
    }
}

impl<'de> Deserialize<'de> for TimeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Ticks(i64),
            Text(String),
        }

        let result = match Wire::deserialize(deserializer)? {
            Wire::Ticks(ticks) => TimeTag::from_ticks(ticks),
            Wire::Text(text) => TimeTag::parse(&text),
        };
        result.map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_round_trip() {
        let tag = TimeTag::parse("2025-03-22 14:05:12 123456").unwrap();
        let ticks = tag.to_ticks();
        let reparsed = TimeTag::parse(&ticks.to_string()).unwrap();
        assert_eq!(reparsed, tag);
        assert_eq!(reparsed.to_iso_form(), "2025-03-22 14:05:12 123456");
    }

    #[test]
    fn test_scpi_and_iso_forms_agree() {
        let iso = TimeTag::parse("2025-03-22 14:05:12 123456").unwrap();
        let scpi = TimeTag::parse("2025:03:22 14:05:12 123456").unwrap();
        assert_eq!(iso, scpi);
    }

    #[test]
    fn test_tick_zero_is_year_one() {
        let tag = TimeTag::from_ticks(0).unwrap();
        assert_eq!(tag.to_iso_form(), "0001-01-01 00:00:00 000000");
        assert_eq!(tag.to_ticks(), 0);
    }

    #[test]
    fn test_unix_epoch_ticks() {
        let tag = TimeTag::parse("1970-01-01 00:00:00 000000").unwrap();
        assert_eq!(tag.to_ticks(), UNIX_EPOCH_TICKS);
    }

    #[test]
    fn test_sub_microsecond_ticks_survive() {
        let ticks = UNIX_EPOCH_TICKS + 1_234_567;
        assert_eq!(TimeTag::from_ticks(ticks).unwrap().to_ticks(), ticks);
    }

    #[test]
    fn test_short_form_truncates_to_milliseconds() {
        let tag = TimeTag::parse("2025-03-22 14:05:12 123956").unwrap();
        assert_eq!(tag.to_short_form(), "2025:03:22 14:05:12 123");
        let reparsed = TimeTag::parse(&tag.to_short_form()).unwrap();
        assert_eq!(reparsed.to_iso_form(), "2025-03-22 14:05:12 123000");
    }

    #[test]
    fn test_malformed_timestamp() {
        for token in ["yesterday", "2025/03/22 14:05:12 000000", "-5", ""] {
            match TimeTag::parse(token) {
                Err(CodecError::MalformedTimestamp { token: t }) => assert_eq!(t, token),
                other => panic!("expected MalformedTimestamp for {token:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_years_outside_tick_range_rejected() {
        for token in [
            "+99999-01-01 00:00:00 000000",
            "0000-06-01 00:00:00 000000",
            "10000:01:01 00:00:00 000000",
        ] {
            assert!(
                matches!(TimeTag::parse(token), Err(CodecError::MalformedTimestamp { .. })),
                "{token}"
            );
        }
        assert!(TimeTag::from_ticks(MAX_TICKS + 1).is_err());
        assert!(TimeTag::from_datetime(NaiveDateTime::MAX).is_err());
        assert!(TimeTag::from_datetime(NaiveDateTime::MIN).is_err());
    }

    #[test]
    fn test_range_edges_round_trip() {
        let last = TimeTag::parse("9999-12-31 23:59:59 9999999").unwrap();
        assert_eq!(last.to_ticks(), MAX_TICKS);
        assert_eq!(TimeTag::from_ticks(MAX_TICKS).unwrap(), last);

        let first = TimeTag::parse("0001:01:01 00:00:00 0").unwrap();
        assert_eq!(first.to_ticks(), 0);
    }

    #[test]
    fn test_from_datetime_truncates_to_ticks() {
        let datetime = NaiveDateTime::parse_from_str("2025-03-22 14:05:12", ISO_FORMAT)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        let tag = TimeTag::from_datetime(datetime).unwrap();
        assert_eq!(tag.as_datetime().nanosecond(), 123_456_700);
    }

    #[test]
    fn test_serde_uses_ticks() {
        let tag = TimeTag::parse("2025-03-22 14:05:12 123456").unwrap();
        let json = serde_json::to_value(tag).unwrap();
        assert_eq!(json, serde_json::json!(tag.to_ticks()));

        let from_text: TimeTag =
            serde_json::from_value(serde_json::json!("2025:03:22 14:05:12 123456")).unwrap();
        assert_eq!(from_text, tag);
    }
}
