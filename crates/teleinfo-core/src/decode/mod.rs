use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::emitter::FrameBatcher;
use crate::make_stub_report;
use crate::source::{BufferedLineSource, LineSource, SourceError};
use crate::store::SensorStore;
use crate::supervisor::{LinkSupervisor, StopReason, SupervisorConfig};
use crate::Report;

mod anomalies;
mod summary;

pub use anomalies::is_blocking;
use anomalies::build_anomalies;
use summary::{build_reading_summaries, build_stream_summary};

/// Consecutive read failures tolerated while replaying a capture.
pub const CAPTURE_READ_ERROR_LIMIT: u32 = 3;

/// Errors that abort a decode. Protocol anomalies never do; they land in the report.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// How fields reach the sensor store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Each field updates the store as soon as it is parsed.
    #[default]
    PerField,
    /// Fields are held until their frame completes; abandoned frames are dropped.
    Batch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub discard_first_line: bool,
    pub dispatch: Dispatch,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            discard_first_line: true,
            dispatch: Dispatch::PerField,
        }
    }
}

/// Replay a recorded serial stream from `path` and build a report.
pub fn decode_capture_file(path: &Path, options: &DecodeOptions) -> Result<Report, DecodeError> {
    let input_bytes = std::fs::metadata(path)?.len();
    let source = BufferedLineSource::open(path)?;
    decode_source(&path.display().to_string(), input_bytes, source, options)
}

/// Drive `source` to its end and build a report labelled with `input_path`.
///
/// Read failures are retried without pause; after
/// `CAPTURE_READ_ERROR_LIMIT` consecutive failures the decode fails.
pub fn decode_source<S: LineSource>(
    input_path: &str,
    input_bytes: u64,
    source: S,
    options: &DecodeOptions,
) -> Result<Report, DecodeError> {
    let config = SupervisorConfig::default()
        .with_retry_pause(Duration::ZERO)
        .with_discard_first_line(options.discard_first_line)
        .with_read_error_limit(Some(CAPTURE_READ_ERROR_LIMIT));
    let supervisor = LinkSupervisor::new(config);
    let mut store = SensorStore::new();

    let outcome = match options.dispatch {
        Dispatch::PerField => supervisor.run(move || Ok(source), &mut store),
        Dispatch::Batch => {
            let mut batcher = FrameBatcher::new(&mut store);
            supervisor.run(move || Ok(source), &mut batcher)
        }
    };
    match outcome.reason {
        StopReason::OpenFailed(err) | StopReason::ReadErrorLimit(err) => return Err(err.into()),
        StopReason::Cancelled | StopReason::EndOfStream => {}
    }

    let mut report = make_stub_report(input_path, input_bytes);
    report.stream_summary = Some(build_stream_summary(&outcome.stats, &store));
    report.readings = build_reading_summaries(&store);
    report.anomalies = build_anomalies(&outcome.stats, store.diagnostics());
    Ok(report)
}
