//! Last-known sensor values.
//!
//! The store owns the only copy of each known field's latest reading. It is
//! fed per field, so a value is replaced as soon as a newer record arrives and
//! survives resyncs and incomplete frames until overwritten. Consumers read
//! snapshots; they never share mutable access.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::catalog::{self, FIELD_CATALOG, SensorField, SensorValue};
use crate::emitter::FieldSink;
use crate::protocols::teleinfo::{ChecksumStatus, FieldRecord};

/// Example contexts kept per diagnostic kind.
pub const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub field: &'static SensorField,
    pub raw: String,
    /// `None` when the raw payload could not be converted.
    pub value: Option<SensorValue>,
    pub updates: u64,
}

/// Counts and a few examples for one kind of store-side anomaly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub count: u64,
    pub examples: Vec<String>,
}

impl Tally {
    fn note(&mut self, example: String) {
        self.count += 1;
        if self.examples.len() < MAX_EXAMPLES && !self.examples.contains(&example) {
            self.examples.push(example);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreDiagnostics {
    pub unknown_fields: Tally,
    pub invalid_values: Tally,
    pub bad_checksums: Tally,
}

#[derive(Debug, Default)]
pub struct SensorStore {
    readings: BTreeMap<usize, Reading>,
    diagnostics: StoreDiagnostics,
    fields_seen: u64,
    frames_published: u64,
}

impl SensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest reading for `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&Reading> {
        catalog::position(name).and_then(|index| self.readings.get(&index))
    }

    /// Converted value for `name`; `None` when never seen or unavailable.
    pub fn value(&self, name: &str) -> Option<&SensorValue> {
        self.get(name).and_then(|reading| reading.value.as_ref())
    }

    /// Readings observed so far, in catalog order.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.values().cloned().collect()
    }

    pub fn diagnostics(&self) -> &StoreDiagnostics {
        &self.diagnostics
    }

    pub fn fields_seen(&self) -> u64 {
        self.fields_seen
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }

    fn record(&mut self, index: usize, record: &FieldRecord) {
        let field = &FIELD_CATALOG[index];
        let value = match field.convert(&record.value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(field = field.name, error = %err, "value unavailable");
                self.diagnostics
                    .invalid_values
                    .note(format!("{}={}", field.name, record.value));
                None
            }
        };
        let entry = self.readings.entry(index).or_insert_with(|| Reading {
            field,
            raw: String::new(),
            value: None,
            updates: 0,
        });
        entry.raw = record.value.clone();
        entry.value = value;
        entry.updates += 1;
    }
}

impl FieldSink for SensorStore {
    fn on_field(&mut self, record: &FieldRecord) {
        self.fields_seen += 1;
        if record.checksum_status() == ChecksumStatus::Invalid {
            debug!(field = %record.name, "checksum mismatch");
            self.diagnostics
                .bad_checksums
                .note(format!("{} {}", record.name, record.value));
        }
        match catalog::position(&record.name) {
            Some(index) => self.record(index, record),
            None => {
                debug!(field = %record.name, "no sensor for field");
                self.diagnostics
                    .unknown_fields
                    .note(record.name.to_ascii_uppercase());
            }
        }
    }

    fn on_frame_complete(&mut self) {
        self.frames_published += 1;
    }
}
