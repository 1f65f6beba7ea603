use std::collections::BTreeMap;

/// Record numbers kept per incident kind.
pub const MAX_INCIDENT_EXAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Incident {
    NonText,
    MalformedField,
    Resync,
    OrphanEnd,
}

/// Counters for one link's lifetime.
///
/// Record numbers are 1-based and count every record read, including the
/// discarded first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub records_read: u64,
    pub first_record_discarded: bool,
    pub non_text_records: u64,
    pub read_errors: u64,
    pub frames_started: u64,
    pub frames_completed: u64,
    pub resyncs: u64,
    pub orphan_ends: u64,
    pub records_before_sync: u64,
    pub malformed_fields: u64,
    pub fields_emitted: u64,
    pub(crate) incidents: BTreeMap<Incident, Vec<u64>>,
}

impl LinkStats {
    /// First few record numbers where `incident` occurred.
    pub fn examples(&self, incident: Incident) -> &[u64] {
        self.incidents
            .get(&incident)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn note(&mut self, incident: Incident, record: u64) {
        let records = self.incidents.entry(incident).or_default();
        if records.len() < MAX_INCIDENT_EXAMPLES {
            records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Incident, LinkStats};

    #[test]
    fn examples_are_capped() {
        let mut stats = LinkStats::default();
        for record in 1..=5 {
            stats.note(Incident::Resync, record);
        }
        assert_eq!(stats.examples(Incident::Resync), &[1, 2, 3]);
        assert!(stats.examples(Incident::NonText).is_empty());
    }
}
