use crate::store::SensorStore;
use crate::supervisor::LinkStats;
use crate::{ReadingSummary, StreamSummary};

pub(crate) fn build_stream_summary(stats: &LinkStats, store: &SensorStore) -> StreamSummary {
    let diagnostics = store.diagnostics();
    StreamSummary {
        records_total: stats.records_read,
        first_record_discarded: stats.first_record_discarded,
        non_text_records: stats.non_text_records,
        read_errors: stats.read_errors,
        frames_started: stats.frames_started,
        frames_completed: stats.frames_completed,
        resyncs: stats.resyncs,
        orphan_ends: stats.orphan_ends,
        records_before_sync: stats.records_before_sync,
        malformed_fields: stats.malformed_fields,
        fields_total: stats.fields_emitted,
        unknown_fields: diagnostics.unknown_fields.count,
        invalid_values: diagnostics.invalid_values.count,
    }
}

pub(crate) fn build_reading_summaries(store: &SensorStore) -> Vec<ReadingSummary> {
    store
        .snapshot()
        .into_iter()
        .map(|reading| ReadingSummary {
            field: reading.field.name.to_string(),
            label: reading.field.label.to_string(),
            kind: reading.field.kind,
            unit: reading.field.unit,
            raw: reading.raw,
            value: reading.value,
            updates: reading.updates,
        })
        .collect()
}
