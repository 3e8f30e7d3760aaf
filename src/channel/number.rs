//! Numeric fields that remember their wire spelling.
//!
//! `0.50`, `0.5` and `.5` are the same value but different tokens. Positional
//! records must re-encode byte for byte, so a decoded number keeps the token
//! it came from; numbers built in code use the shortest `Display` form.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A numeric field value together with its token.
///
/// Equality compares the token as well as the value, so two spellings of the
/// same number are distinct configurations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireNumber<T> {
    value: T,
    token: String,
}

impl<T: Copy> WireNumber<T> {
    /// The parsed value.
    pub fn value(&self) -> T {
        self.value
    }
}

impl<T> WireNumber<T> {
    /// The token written on encode.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl WireNumber<i64> {
    /// Parse an integer token, keeping its spelling (`05`, `+5`).
    pub fn parse(token: &str) -> Option<Self> {
        token.parse().ok().map(|value| Self {
            value,
            token: token.to_string(),
        })
    }
}

impl From<i64> for WireNumber<i64> {
    fn from(value: i64) -> Self {
        Self {
            value,
            token: value.to_string(),
        }
    }
}

impl WireNumber<f64> {
    /// Parse a finite decimal token, keeping its spelling (`0.50`, `1.0`).
    ///
    /// `nan`, `inf` and friends are rejected.
    pub fn parse(token: &str) -> Option<Self> {
        token
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(|value| Self {
                value,
                token: token.to_string(),
            })
    }

    /// Wrap a finite value; `None` for NaN and infinities.
    pub fn finite(value: f64) -> Option<Self> {
        value.is_finite().then(|| Self {
            value,
            token: value.to_string(),
        })
    }
}

impl<T> fmt::Display for WireNumber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl<T: Serialize> Serialize for WireNumber<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireNumber<i64> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(WireNumber::from)
    }
}

impl<'de> Deserialize<'de> for WireNumber<f64> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        WireNumber::finite(value).ok_or_else(|| D::Error::custom("number must be finite"))
    }
}
