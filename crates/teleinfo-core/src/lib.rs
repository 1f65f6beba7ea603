//! Teleinfo core library: decoding of French electricity meter serial streams.
//!
//! Layers, from the wire up: a `source` yields newline-terminated records,
//! `protocols::teleinfo` turns each record into a trimmed text line and field
//! groups (layout/reader/parser), `frame` tracks start/end markers, and the
//! `supervisor` drives the read loop and hands assembled fields to a
//! `FieldSink`. The `catalog` names the known fields and their conversions;
//! `store` keeps the last value per field. `decode_capture_file` ties the
//! pieces together for a recorded stream and builds a deterministic report.
//!
//! Invariants:
//! - Field data is only emitted while a frame is open.
//! - A start marker always opens a fresh frame, abandoning any open one.
//! - Report ordering follows catalog order for readings and severity then id
//!   for anomalies.
//!
//! Version française (résumé):
//! Cette crate décode le flux Télé-information client (TIC) : source de lignes
//! -> décodage de ligne -> automate de trame (STX/ETX) -> diffusion des
//! champs. Le catalogue décrit les champs connus et leurs conversions ; le
//! magasin conserve la dernière valeur. Le rapport produit est déterministe.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use teleinfo_core::{DecodeOptions, decode_capture_file};
//!
//! let report = decode_capture_file(Path::new("meter.tic"), &DecodeOptions::default())?;
//! println!("readings: {}", report.readings.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod catalog;
mod decode;
pub mod emitter;
pub mod frame;
pub mod protocols;
pub mod source;
pub mod store;
pub mod supervisor;

pub use catalog::{SensorKind, SensorValue, Unit};
pub use decode::{
    CAPTURE_READ_ERROR_LIMIT, DecodeError, DecodeOptions, Dispatch, decode_capture_file,
    decode_source, is_blocking,
};
pub use emitter::{FieldEmitter, FieldSink, FrameBatcher};
pub use frame::{FrameAssembler, FrameEvent, FrameState};
pub use protocols::teleinfo::{FieldRecord, SERIAL_SETTINGS, SerialSettings};
pub use source::{BufferedLineSource, LineSource, RawRecord, SourceError};
pub use store::SensorStore;
pub use supervisor::{
    CancellationToken, LinkOutcome, LinkState, LinkSupervisor, StopReason, SupervisorConfig,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no generation time is supplied.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Decoding report with deterministic ordering.
///
/// # Examples
/// ```
/// use teleinfo_core::make_stub_report;
///
/// let report = make_stub_report("meter.tic", 123);
/// assert_eq!(report.report_version, teleinfo_core::REPORT_VERSION);
/// assert!(report.readings.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// RFC3339 timestamp representing the report generation time.
    pub generated_at: String,

    /// Input stream metadata.
    pub input: InputInfo,

    /// Link and framing counters (absent on stub reports).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_summary: Option<StreamSummary>,
    /// Last known value per field, in catalog order.
    pub readings: Vec<ReadingSummary>,
    /// Anomalies sorted by severity, then id.
    pub anomalies: Vec<Anomaly>,
}

/// Tool metadata embedded in reports.
///
/// # Examples
/// ```
/// use teleinfo_core::ToolInfo;
///
/// let tool = ToolInfo {
///     name: "teleinfo".to_string(),
///     version: "0.1.0".to_string(),
/// };
/// assert_eq!(tool.name, "teleinfo");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "teleinfo").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input stream metadata embedded in reports.
///
/// # Examples
/// ```
/// use teleinfo_core::InputInfo;
///
/// let input = InputInfo {
///     path: "meter.tic".to_string(),
///     bytes: 1024,
/// };
/// assert_eq!(input.bytes, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the decoder.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Link and framing counters for one decoded stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    /// Records read, including the discarded first record.
    pub records_total: u64,
    pub first_record_discarded: bool,
    pub non_text_records: u64,
    pub read_errors: u64,
    pub frames_started: u64,
    pub frames_completed: u64,
    /// Frames abandoned by a start marker inside an open frame.
    pub resyncs: u64,
    pub orphan_ends: u64,
    /// Field lines seen while awaiting a start marker.
    pub records_before_sync: u64,
    pub malformed_fields: u64,
    /// Fields emitted to the store, known or not.
    pub fields_total: u64,
    pub unknown_fields: u64,
    pub invalid_values: u64,
}

/// Last known state of one catalog field.
///
/// # Examples
/// ```
/// use teleinfo_core::{ReadingSummary, SensorKind, SensorValue, Unit};
///
/// let reading = ReadingSummary {
///     field: "IINST".to_string(),
///     label: "Intensité instantanée".to_string(),
///     kind: SensorKind::IntegerCount,
///     unit: Some(Unit::Ampere),
///     raw: "002".to_string(),
///     value: Some(SensorValue::Count(2)),
///     updates: 1,
/// };
/// assert_eq!(reading.value, Some(SensorValue::Count(2)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSummary {
    pub field: String,
    pub label: String,
    pub kind: SensorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    /// Last payload as received.
    pub raw: String,
    /// Converted value; absent when the last payload failed conversion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<SensorValue>,
    pub updates: u64,
}

/// Aggregated anomaly entry.
///
/// # Examples
/// ```
/// use teleinfo_core::Anomaly;
///
/// let anomaly = Anomaly {
///     id: "TIC-RESYNC".to_string(),
///     severity: "warning".to_string(),
///     message: "Start marker inside an open frame".to_string(),
///     count: 1,
///     examples: vec!["record 12".to_string()],
/// };
/// assert_eq!(anomaly.count, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Stable identifier (e.g., "TIC-BAD-CHECKSUM").
    pub id: String,
    /// One of "error", "warning", "info".
    pub severity: String,
    pub message: String,
    pub count: u64,
    /// A few occurrences, oldest first.
    pub examples: Vec<String>,
}

/// Build an empty report with the current schema and tool metadata.
///
/// # Examples
/// ```
/// use teleinfo_core::make_stub_report;
///
/// let report = make_stub_report("meter.tic", 0);
/// assert_eq!(report.tool.name, "teleinfo");
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "teleinfo".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        stream_summary: None,
        readings: vec![],
        anomalies: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_omits_optional_fields_when_none() {
        let mut report = make_stub_report("meter.tic", 1);
        report.readings.push(ReadingSummary {
            field: "ADCO".to_string(),
            label: "Adresse d'identification".to_string(),
            kind: SensorKind::FreeText,
            unit: None,
            raw: "0123".to_string(),
            value: None,
            updates: 1,
        });

        let value = serde_json::to_value(&report).expect("report json");
        assert!(value.get("stream_summary").is_none());
        let reading = &value["readings"][0];
        assert!(reading.get("unit").is_none());
        assert!(reading.get("value").is_none());
        assert_eq!(reading["kind"], "text");
    }

    #[test]
    fn scaled_values_serialize_as_plain_numbers() {
        let mut report = make_stub_report("meter.tic", 1);
        report.readings.push(ReadingSummary {
            field: "BASE".to_string(),
            label: "Index option Base".to_string(),
            kind: SensorKind::IntegerScaledBy1000,
            unit: Some(Unit::KilowattHour),
            raw: "001234500".to_string(),
            value: Some(SensorValue::Scaled(1234.5)),
            updates: 3,
        });

        let value = serde_json::to_value(&report).expect("report json");
        let reading = &value["readings"][0];
        assert_eq!(reading["value"], serde_json::json!(1234.5));
        assert_eq!(reading["unit"], "kWh");
        assert_eq!(reading["kind"], "scaled_1000");
    }
}
