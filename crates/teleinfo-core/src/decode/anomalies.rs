use crate::Anomaly;
use crate::store::{StoreDiagnostics, Tally};
use crate::supervisor::{Incident, LinkStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    fn rank(label: &str) -> u8 {
        match label {
            "error" => 0,
            "warning" => 1,
            _ => 2,
        }
    }
}

struct Entry {
    id: &'static str,
    severity: Severity,
    message: &'static str,
    count: u64,
    examples: Vec<String>,
}

/// Collect anomalies from link and store counters, sorted by severity then id.
pub(crate) fn build_anomalies(stats: &LinkStats, diagnostics: &StoreDiagnostics) -> Vec<Anomaly> {
    let entries = [
        link_entry(
            "TIC-NON-ASCII",
            Severity::Warning,
            "Record is not ASCII text",
            stats.non_text_records,
            stats,
            Incident::NonText,
        ),
        link_entry(
            "TIC-MALFORMED-FIELD",
            Severity::Warning,
            "Field group has fewer than two tokens",
            stats.malformed_fields,
            stats,
            Incident::MalformedField,
        ),
        link_entry(
            "TIC-RESYNC",
            Severity::Warning,
            "Start marker inside an open frame",
            stats.resyncs,
            stats,
            Incident::Resync,
        ),
        link_entry(
            "TIC-ORPHAN-END",
            Severity::Info,
            "End marker without an open frame",
            stats.orphan_ends,
            stats,
            Incident::OrphanEnd,
        ),
        Entry {
            id: "TIC-READ-ERROR",
            severity: Severity::Error,
            message: "Transport read failed",
            count: stats.read_errors,
            examples: Vec::new(),
        },
        store_entry(
            "TIC-UNKNOWN-FIELD",
            Severity::Info,
            "Field not in catalog",
            &diagnostics.unknown_fields,
        ),
        store_entry(
            "TIC-INVALID-VALUE",
            Severity::Error,
            "Payload does not match field kind",
            &diagnostics.invalid_values,
        ),
        store_entry(
            "TIC-BAD-CHECKSUM",
            Severity::Error,
            "Group checksum mismatch",
            &diagnostics.bad_checksums,
        ),
    ];

    let mut anomalies: Vec<Anomaly> = entries
        .into_iter()
        .filter(|entry| entry.count > 0)
        .map(|entry| Anomaly {
            id: entry.id.to_string(),
            severity: entry.severity.label().to_string(),
            message: entry.message.to_string(),
            count: entry.count,
            examples: entry.examples,
        })
        .collect();
    anomalies.sort_by(|a, b| {
        Severity::rank(&a.severity)
            .cmp(&Severity::rank(&b.severity))
            .then_with(|| a.id.cmp(&b.id))
    });
    anomalies
}

/// Severity labels that make `--strict` style checks fail.
pub fn is_blocking(anomaly: &Anomaly) -> bool {
    Severity::rank(&anomaly.severity) < Severity::rank(Severity::Info.label())
}

fn link_entry(
    id: &'static str,
    severity: Severity,
    message: &'static str,
    count: u64,
    stats: &LinkStats,
    incident: Incident,
) -> Entry {
    Entry {
        id,
        severity,
        message,
        count,
        examples: stats
            .examples(incident)
            .iter()
            .map(|record| format!("record {record}"))
            .collect(),
    }
}

fn store_entry(
    id: &'static str,
    severity: Severity,
    message: &'static str,
    tally: &Tally,
) -> Entry {
    Entry {
        id,
        severity,
        message,
        count: tally.count,
        examples: tally.examples.clone(),
    }
}
