use thiserror::Error;

use super::fields::SensorKind;

/// Raised when a payload does not fit its field's kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("invalid {kind} payload '{raw}': expected decimal digits")]
    NotDecimal { kind: SensorKind, raw: String },
    #[error("{kind} payload '{raw}' does not fit in 64 bits")]
    Overflow { kind: SensorKind, raw: String },
}
