//! Link supervision: the read loop between a line source and the frame
//! assembler.
//!
//! States: `Connecting -> Streaming -> Stopped`. A failed open stops the link
//! without retrying. A failed read is logged, followed by a short pause and
//! the next read; frame state is left alone, since the next start marker
//! resynchronizes. Cancellation is checked before every read and during
//! pauses, and stops the link without flushing a partial frame.
//!
//! The first record after opening is always discarded: the meter's first
//! read after the port opens is routinely garbled.
//!
//! Version française (résumé):
//! Boucle de lecture : ouverture (échec = arrêt définitif), lecture en
//! continu (erreur = journalisation, pause, nouvelle lecture), arrêt sur
//! annulation. La première ligne lue est toujours ignorée.

mod cancel;
mod stats;

pub use cancel::{CANCEL_POLL_INTERVAL, CancellationToken};
pub use stats::{Incident, LinkStats, MAX_INCIDENT_EXAMPLES};

use std::time::Duration;

use tracing::{debug, error, info};

use crate::emitter::FieldSink;
use crate::frame::{DiscardReason, FrameAssembler, FrameEvent, FrameState};
use crate::protocols::teleinfo::decode_line;
use crate::source::{LineSource, RawRecord, SourceError};

/// Default pause after a failed read.
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub retry_pause: Duration,
    pub discard_first_line: bool,
    /// Stop after this many consecutive failed reads. `None` retries forever.
    pub read_error_limit: Option<u32>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retry_pause: DEFAULT_RETRY_PAUSE,
            discard_first_line: true,
            read_error_limit: None,
        }
    }
}

impl SupervisorConfig {
    pub fn with_retry_pause(mut self, retry_pause: Duration) -> Self {
        self.retry_pause = retry_pause;
        self
    }

    pub fn with_discard_first_line(mut self, discard: bool) -> Self {
        self.discard_first_line = discard;
        self
    }

    pub fn with_read_error_limit(mut self, limit: Option<u32>) -> Self {
        self.read_error_limit = limit;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Streaming,
    Stopped,
}

#[derive(Debug)]
pub enum StopReason {
    OpenFailed(SourceError),
    Cancelled,
    EndOfStream,
    /// Consecutive read failures reached `read_error_limit`; holds the last.
    ReadErrorLimit(SourceError),
}

#[derive(Debug)]
pub struct LinkOutcome {
    pub state: LinkState,
    pub reason: StopReason,
    pub stats: LinkStats,
}

pub struct LinkSupervisor {
    config: SupervisorConfig,
    cancel: CancellationToken,
    state: LinkState,
    assembler: FrameAssembler,
    stats: LinkStats,
}

impl LinkSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    pub fn with_cancellation(config: SupervisorConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            state: LinkState::Connecting,
            assembler: FrameAssembler::new(),
            stats: LinkStats::default(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn frame_state(&self) -> FrameState {
        self.assembler.state()
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Open the link with `open` and drive `sink` until the link stops.
    ///
    /// Never fails: every outcome, including a failed open, is reported in
    /// the returned `LinkOutcome`.
    pub fn run<S, O, K>(mut self, open: O, sink: &mut K) -> LinkOutcome
    where
        S: LineSource,
        O: FnOnce() -> Result<S, SourceError>,
        K: FieldSink + ?Sized,
    {
        self.state = LinkState::Connecting;
        debug!("opening link");
        let mut source = match open() {
            Ok(source) => source,
            Err(err) => {
                error!(error = %err, "unable to open link");
                return self.stop(StopReason::OpenFailed(err));
            }
        };

        self.state = LinkState::Streaming;
        info!("link streaming");
        let mut discard_pending = self.config.discard_first_line;
        let mut consecutive_errors = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                info!("link cancelled");
                return self.stop(StopReason::Cancelled);
            }
            match source.next_record() {
                Ok(Some(record)) => {
                    consecutive_errors = 0;
                    if discard_pending {
                        discard_pending = false;
                        self.stats.records_read += 1;
                        self.stats.first_record_discarded = true;
                        debug!(bytes = record.len(), "discarding first record after open");
                        continue;
                    }
                    self.feed_record(&record, sink);
                }
                Ok(None) => {
                    info!("end of stream");
                    return self.stop(StopReason::EndOfStream);
                }
                Err(err) => {
                    self.stats.read_errors += 1;
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    error!(error = %err, "error during serial read");
                    if let Some(limit) = self.config.read_error_limit {
                        if consecutive_errors >= limit {
                            return self.stop(StopReason::ReadErrorLimit(err));
                        }
                    }
                    self.cancel.sleep(self.config.retry_pause);
                }
            }
        }
    }

    /// Push one record through decoding and frame assembly.
    ///
    /// Exposed for hosts that own their read loop; `run` uses it for every
    /// record after the first.
    pub fn feed_record<K: FieldSink + ?Sized>(&mut self, record: &RawRecord, sink: &mut K) {
        self.stats.records_read += 1;
        let record_no = self.stats.records_read;

        let line = match decode_line(record) {
            Ok(line) => line,
            Err(err) => {
                debug!(record = record_no, error = %err, "discarding non-text record");
                self.stats.non_text_records += 1;
                self.stats.note(Incident::NonText, record_no);
                return;
            }
        };

        match self.assembler.process(&line) {
            FrameEvent::Started { resync } => {
                self.stats.frames_started += 1;
                if resync {
                    self.stats.resyncs += 1;
                    self.stats.note(Incident::Resync, record_no);
                    sink.on_resync();
                }
            }
            FrameEvent::Field(field) => {
                self.stats.fields_emitted += 1;
                sink.on_field(&field);
            }
            FrameEvent::Completed { .. } => {
                self.stats.frames_completed += 1;
                sink.on_frame_complete();
            }
            FrameEvent::Discarded(DiscardReason::BeforeSync) => {
                self.stats.records_before_sync += 1;
            }
            FrameEvent::Discarded(DiscardReason::OrphanEnd) => {
                self.stats.orphan_ends += 1;
                self.stats.note(Incident::OrphanEnd, record_no);
            }
            FrameEvent::Discarded(DiscardReason::MalformedField) => {
                self.stats.malformed_fields += 1;
                self.stats.note(Incident::MalformedField, record_no);
            }
        }
    }

    fn stop(mut self, reason: StopReason) -> LinkOutcome {
        self.state = LinkState::Stopped;
        LinkOutcome {
            state: self.state,
            reason,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkState, LinkSupervisor, StopReason, SupervisorConfig};
    use crate::emitter::FieldSink;
    use crate::frame::FrameState;
    use crate::protocols::teleinfo::FieldRecord;
    use crate::source::{LineSource, RawRecord, SourceError};
    use std::collections::VecDeque;
    use std::time::Duration;

    struct Script(VecDeque<Result<Option<RawRecord>, SourceError>>);

    impl Script {
        fn lines(lines: &[&str]) -> Self {
            Script(
                lines
                    .iter()
                    .map(|line| Ok(Some(RawRecord::from(*line))))
                    .collect(),
            )
        }
    }

    impl LineSource for Script {
        fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    #[derive(Default)]
    struct Collect(Vec<(String, String)>, usize);

    impl FieldSink for Collect {
        fn on_field(&mut self, record: &FieldRecord) {
            self.0.push((record.name.clone(), record.value.clone()));
        }

        fn on_frame_complete(&mut self) {
            self.1 += 1;
        }
    }

    fn quick() -> SupervisorConfig {
        SupervisorConfig::default().with_retry_pause(Duration::ZERO)
    }

    #[test]
    fn first_record_is_discarded() {
        let supervisor = LinkSupervisor::new(quick());
        let mut sink = Collect::default();
        let script = Script::lines(&["\x02", "\x02", "ADCO 1", "\x03"]);
        let outcome = supervisor.run(|| Ok(script), &mut sink);

        assert!(matches!(outcome.reason, StopReason::EndOfStream));
        assert_eq!(outcome.state, LinkState::Stopped);
        assert!(outcome.stats.first_record_discarded);
        assert_eq!(outcome.stats.records_read, 4);
        assert_eq!(sink.0, vec![("ADCO".to_string(), "1".to_string())]);
        assert_eq!(sink.1, 1);
    }

    #[test]
    fn open_failure_stops_without_reading() {
        let supervisor = LinkSupervisor::new(quick());
        let mut sink = Collect::default();
        let outcome = supervisor.run(
            || -> Result<Script, SourceError> {
                Err(SourceError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such device",
                )))
            },
            &mut sink,
        );
        assert!(matches!(outcome.reason, StopReason::OpenFailed(_)));
        assert_eq!(outcome.stats.records_read, 0);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn feed_record_counts_non_text() {
        let mut supervisor = LinkSupervisor::new(quick());
        let mut sink = Collect::default();
        supervisor.feed_record(&RawRecord::from(&b"\x02\n"[..]), &mut sink);
        supervisor.feed_record(&RawRecord::from(&b"PAPP \xff\n"[..]), &mut sink);
        assert_eq!(supervisor.stats().non_text_records, 1);
        assert_eq!(
            supervisor.stats().examples(super::Incident::NonText),
            &[2]
        );
        assert_eq!(supervisor.frame_state(), FrameState::InFrame { fields: 0 });
    }

    #[test]
    fn read_error_limit_stops_link() {
        let supervisor = LinkSupervisor::new(quick().with_read_error_limit(Some(2)));
        let mut sink = Collect::default();
        let script = Script(
            (0..5)
                .map(|_| {
                    Err(SourceError::Transport {
                        context: "test",
                        message: "unplugged".to_string(),
                    })
                })
                .collect(),
        );
        let outcome = supervisor.run(|| Ok(script), &mut sink);
        assert!(matches!(outcome.reason, StopReason::ReadErrorLimit(_)));
        assert_eq!(outcome.stats.read_errors, 2);
    }

    #[test]
    fn cancelled_before_first_read() {
        let supervisor = LinkSupervisor::new(quick());
        supervisor.cancellation_token().cancel();
        let mut sink = Collect::default();
        let outcome = supervisor.run(|| Ok(Script::lines(&["x", "\x02"])), &mut sink);
        assert!(matches!(outcome.reason, StopReason::Cancelled));
        assert_eq!(outcome.stats.records_read, 0);
    }
}
