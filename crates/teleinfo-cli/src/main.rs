use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use glob::glob;
use serde::Serialize;
use teleinfo_core::catalog::{self, FIELD_CATALOG, SensorValue, Unit};
use teleinfo_core::protocols::teleinfo::Parity;
use teleinfo_core::{
    BufferedLineSource, CancellationToken, DecodeOptions, Dispatch, FieldRecord, FieldSink,
    FrameBatcher, LinkSupervisor, SERIAL_SETTINGS, StopReason, SupervisorConfig,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TELEINFO_BUILD_COMMIT"),
    " ",
    env!("TELEINFO_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "teleinfo")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Decoder for Teleinfo (TIC) serial streams from French electricity meters.",
    long_about = None,
    after_help = "Examples:\n  teleinfo capture decode meter.tic -o report.json\n  teleinfo serial watch /dev/ttyUSB0 --max-frames 5\n  teleinfo catalog --pretty"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on recorded serial streams.
    Capture {
        #[command(subcommand)]
        command: CaptureCommands,
    },
    /// Operations on a live serial device.
    Serial {
        #[command(subcommand)]
        command: SerialCommands,
    },
    /// Print the known field catalog as JSON.
    Catalog {
        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CaptureCommands {
    /// Decode a recorded stream and generate a versioned JSON report.
    #[command(
        after_help = "Examples:\n  teleinfo capture decode meter.tic -o report.json\n  teleinfo capture decode 'captures/*.tic' --stdout --pretty"
    )]
    Decode {
        /// Path to a .tic or .txt capture (a glob matching one file is accepted)
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if error or warning anomalies are present
        #[arg(long)]
        strict: bool,

        /// List anomalies after decoding
        #[arg(long)]
        list_anomalies: bool,

        /// Decode the first record instead of discarding it
        #[arg(long)]
        keep_first_line: bool,

        /// Publish fields only when their frame completes
        #[arg(long)]
        batch: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SerialCommands {
    /// Stream field updates from a serial device as JSON lines.
    #[command(
        after_help = "The port must already be configured (1200 baud, 7E1, RTS/CTS).\n\nExamples:\n  teleinfo serial watch /dev/ttyUSB0\n  teleinfo serial watch /dev/ttyAMA0 --max-frames 1 --batch"
    )]
    Watch {
        /// Serial device path (or any readable stream)
        device: PathBuf,

        /// Stop after this many completed frames
        #[arg(long)]
        max_frames: Option<u64>,

        /// Pause after a failed read, in milliseconds
        #[arg(long, default_value_t = 1000)]
        retry_pause_ms: u64,

        /// Publish fields only when their frame completes
        #[arg(long)]
        batch: bool,

        /// Decode the first record instead of discarding it
        #[arg(long)]
        keep_first_line: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Capture { command } => match command {
            CaptureCommands::Decode {
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
                list_anomalies,
                keep_first_line,
                batch,
            } => cmd_capture_decode(
                input,
                report,
                stdout,
                OutputFormat { pretty, compact },
                quiet,
                strict,
                list_anomalies,
                decode_options(keep_first_line, batch),
            ),
        },
        Commands::Serial { command } => match command {
            SerialCommands::Watch {
                device,
                max_frames,
                retry_pause_ms,
                batch,
                keep_first_line,
            } => cmd_serial_watch(device, max_frames, retry_pause_ms, batch, keep_first_line),
        },
        Commands::Catalog { pretty } => cmd_catalog(pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{:#}", err), None)
    }
}

#[derive(Debug, Clone, Copy)]
struct OutputFormat {
    pretty: bool,
    compact: bool,
}

fn decode_options(keep_first_line: bool, batch: bool) -> DecodeOptions {
    DecodeOptions {
        discard_first_line: !keep_first_line,
        dispatch: if batch {
            Dispatch::Batch
        } else {
            Dispatch::PerField
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_capture_decode(
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    format: OutputFormat,
    quiet: bool,
    strict: bool,
    list_anomalies: bool,
    options: DecodeOptions,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    let report = if stdout {
        None
    } else {
        Some(report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report.as_ref() {
        ensure_distinct_output(report_path, &input_abs)?;
    }

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .tic or .txt capture".to_string()),
        ));
    }

    let rep = teleinfo_core::decode_capture_file(&resolved_input, &options)
        .context("Teleinfo capture decoding failed")?;
    let json = serialize_json(&rep, format)?;

    match report {
        None => print!("{}", json),
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            if !quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if list_anomalies && !quiet {
        print_anomalies(&rep);
    }
    if strict && has_blocking_anomalies(&rep) {
        return Err(CliError::new(
            "stream anomalies detected",
            Some("use --list-anomalies to inspect".to_string()),
        ));
    }
    Ok(())
}

fn ensure_distinct_output(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let report_abs = report_path
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose();
    // A missing output directory cannot hold the input; it is created later.
    let Ok(Some(report_dir)) = report_abs else {
        return Ok(());
    };
    let file_name = report_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid report path: {}", report_path.display()))?;
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn serialize_json<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String, CliError> {
    if format.pretty && format.compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if format.pretty {
        serde_json::to_string_pretty(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn has_blocking_anomalies(rep: &teleinfo_core::Report) -> bool {
    rep.anomalies.iter().any(teleinfo_core::is_blocking)
}

fn print_anomalies(rep: &teleinfo_core::Report) {
    eprintln!("Anomalies:");
    for anomaly in &rep.anomalies {
        eprintln!(
            "  {} {} ({}): {}",
            anomaly.severity, anomaly.id, anomaly.count, anomaly.message
        );
        for example in &anomaly.examples {
            eprintln!("    {}", example);
        }
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .tic or .txt capture".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "tic" && ext != "txt" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .tic or .txt capture".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .tic or .txt".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single capture file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}

fn cmd_catalog(pretty: bool) -> Result<(), CliError> {
    let json = serialize_json(
        &FIELD_CATALOG[..],
        OutputFormat {
            pretty,
            compact: false,
        },
    )?;
    println!("{}", json);
    Ok(())
}

fn cmd_serial_watch(
    device: PathBuf,
    max_frames: Option<u64>,
    retry_pause_ms: u64,
    batch: bool,
    keep_first_line: bool,
) -> Result<(), CliError> {
    if !device.exists() {
        return Err(CliError::new(
            format!("device not found: {}", device.display()),
            Some("check the device path (e.g. /dev/ttyUSB0) and permissions".to_string()),
        ));
    }
    if max_frames == Some(0) {
        return Err(CliError::new(
            "--max-frames must be at least 1",
            Some("omit --max-frames to watch until end of stream".to_string()),
        ));
    }

    let config = SupervisorConfig::default()
        .with_retry_pause(Duration::from_millis(retry_pause_ms))
        .with_discard_first_line(!keep_first_line);
    let cancel = CancellationToken::new();
    let supervisor = LinkSupervisor::with_cancellation(config, cancel.clone());
    info!(device = %device.display(), settings = %SERIAL_SETTINGS, "watching device");

    let output = if batch {
        WatchOutput::PerFrame
    } else {
        WatchOutput::PerField
    };
    let mut printer = WatchPrinter::new(io::stdout().lock(), output, cancel, max_frames);
    let open = || BufferedLineSource::open(&device);
    let outcome = if batch {
        let mut batcher = FrameBatcher::new(&mut printer);
        supervisor.run(open, &mut batcher)
    } else {
        supervisor.run(open, &mut printer)
    };
    if let Some(err) = printer.write_error.take() {
        return Err(CliError::new(format!("failed to write output: {}", err), None));
    }

    match outcome.reason {
        StopReason::OpenFailed(err) => Err(CliError::new(
            format!("unable to open {}: {}", device.display(), err),
            Some(stty_hint(&device)),
        )),
        StopReason::ReadErrorLimit(err) => Err(CliError::new(
            format!("giving up on {}: {}", device.display(), err),
            Some(stty_hint(&device)),
        )),
        StopReason::Cancelled | StopReason::EndOfStream => {
            info!(
                frames = outcome.stats.frames_completed,
                fields = outcome.stats.fields_emitted,
                resyncs = outcome.stats.resyncs,
                "watch finished"
            );
            Ok(())
        }
    }
}

/// `stty` invocation that puts a Linux tty in the meter's line settings.
fn stty_hint(device: &Path) -> String {
    let settings = SERIAL_SETTINGS;
    let parity = match settings.parity {
        Parity::None => "-parenb",
        Parity::Even => "parenb -parodd",
        Parity::Odd => "parenb parodd",
    };
    let stop_bits = if settings.stop_bits > 1 { "cstopb" } else { "-cstopb" };
    let flow = if settings.hardware_flow_control {
        "crtscts"
    } else {
        "-crtscts"
    };
    format!(
        "the meter link runs at {}; configure the port first: stty -F {} {} cs{} {} {} {} raw",
        settings,
        device.display(),
        settings.baud_rate,
        settings.data_bits,
        parity,
        stop_bits,
        flow
    )
}

/// One field as printed by `serial watch`.
#[derive(Debug, Serialize)]
struct FieldUpdate {
    field: String,
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<SensorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
}

impl FieldUpdate {
    fn from_record(record: &FieldRecord) -> Self {
        let field = catalog::lookup(&record.name);
        let value = field.and_then(|field| match field.convert(&record.value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(field = field.name, error = %err, "value unavailable");
                None
            }
        });
        Self {
            field: field.map_or_else(|| record.name.clone(), |field| field.name.to_string()),
            raw: record.value.clone(),
            value,
            unit: field.and_then(|field| field.unit).map(|unit: Unit| unit.symbol()),
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldLine<'a> {
    ts: &'a str,
    #[serde(flatten)]
    update: &'a FieldUpdate,
}

#[derive(Debug, Serialize)]
struct FrameLine<'a> {
    ts: &'a str,
    fields: &'a [FieldUpdate],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchOutput {
    /// One line per field, as soon as it is read.
    PerField,
    /// One line per completed frame holding all its fields.
    PerFrame,
}

/// Prints JSON lines and stops the link after `max_frames`.
struct WatchPrinter<W: Write> {
    out: W,
    output: WatchOutput,
    cancel: CancellationToken,
    max_frames: Option<u64>,
    frames: u64,
    pending: Vec<FieldUpdate>,
    write_error: Option<io::Error>,
}

impl<W: Write> WatchPrinter<W> {
    fn new(
        out: W,
        output: WatchOutput,
        cancel: CancellationToken,
        max_frames: Option<u64>,
    ) -> Self {
        Self {
            out,
            output,
            cancel,
            max_frames,
            frames: 0,
            pending: Vec::new(),
            write_error: None,
        }
    }

    fn write_line<T: Serialize>(&mut self, line: &T) {
        if self.write_error.is_some() {
            return;
        }
        let result = serde_json::to_writer(&mut self.out, line)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            self.write_error = Some(err);
            self.cancel.cancel();
        }
    }
}

impl<W: Write> FieldSink for WatchPrinter<W> {
    fn on_field(&mut self, record: &FieldRecord) {
        let update = FieldUpdate::from_record(record);
        match self.output {
            WatchOutput::PerField => {
                let ts = now_rfc3339();
                self.write_line(&FieldLine {
                    ts: &ts,
                    update: &update,
                });
            }
            WatchOutput::PerFrame => self.pending.push(update),
        }
    }

    fn on_frame_complete(&mut self) {
        if self.output == WatchOutput::PerFrame {
            let fields = std::mem::take(&mut self.pending);
            let ts = now_rfc3339();
            self.write_line(&FrameLine {
                ts: &ts,
                fields: &fields,
            });
        }
        self.frames += 1;
        debug!(frames = self.frames, "frame complete");
        if self.max_frames.is_some_and(|max| self.frames >= max) {
            self.cancel.cancel();
        }
    }

    fn on_resync(&mut self) {
        self.pending.clear();
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| teleinfo_core::DEFAULT_GENERATED_AT.to_string())
}
