use serde::{Deserialize, Serialize};

use super::error::ConversionError;
use super::fields::SensorKind;

/// A converted reading. Serializes as a bare JSON string or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Count(u64),
    Scaled(f64),
    Text(String),
}

/// Convert a raw payload according to `kind`.
///
/// # Errors
/// Numeric kinds fail with `ConversionError` unless the payload is made of
/// decimal digits only and fits in a `u64`.
pub fn convert(kind: SensorKind, raw: &str) -> Result<SensorValue, ConversionError> {
    match kind {
        SensorKind::FreeText => Ok(SensorValue::Text(raw.to_string())),
        SensorKind::IntegerCount => parse_decimal(kind, raw).map(SensorValue::Count),
        SensorKind::IntegerScaledBy1000 => {
            parse_decimal(kind, raw).map(|value| SensorValue::Scaled(value as f64 / 1000.0))
        }
    }
}

fn parse_decimal(kind: SensorKind, raw: &str) -> Result<u64, ConversionError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConversionError::NotDecimal {
            kind,
            raw: raw.to_string(),
        });
    }
    raw.parse::<u64>().map_err(|_| ConversionError::Overflow {
        kind,
        raw: raw.to_string(),
    })
}
