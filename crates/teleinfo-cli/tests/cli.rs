use std::fs;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("teleinfo"))
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn fixture(name: &str) -> std::path::PathBuf {
    repo_root()
        .join("tests")
        .join("golden")
        .join(name)
        .join("input.tic")
}

fn clean_capture() -> std::path::PathBuf {
    fixture("two_frames")
}

fn noisy_capture() -> std::path::PathBuf {
    fixture("resync_and_garbage")
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("capture").and(contains("serial")).and(contains("catalog")));
    cmd()
        .arg("capture")
        .arg("decode")
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.tic");
    let report = temp.path().join("report.json");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn unsupported_extension_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.bin");
    fs::write(&input, b"\x02\nADCO 1\n\x03\n").expect("write input");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(input)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("unsupported input format"));
}

#[test]
fn stdout_outputs_json() {
    let assert = cmd()
        .arg("capture")
        .arg("decode")
        .arg(clean_capture())
        .arg("--stdout")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let report: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(report["tool"]["name"], "teleinfo");
    assert_eq!(report["stream_summary"]["frames_completed"], 2);
}

#[test]
fn report_file_is_written() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("out").join("report.json");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(clean_capture())
        .arg("-o")
        .arg(&report)
        .assert()
        .success()
        .stderr(contains("OK: report written"));

    let json: Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("read report")).expect("json");
    assert_eq!(json["readings"][0]["field"], "ADCO");
}

#[test]
fn report_path_must_differ_from_input() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.tic");
    fs::copy(clean_capture(), &input).expect("copy capture");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(&input)
        .arg("-o")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("must differ from input"));
}

#[test]
fn glob_matching_one_file_is_accepted() {
    let temp = TempDir::new().expect("tempdir");
    fs::copy(clean_capture(), temp.path().join("meter.tic")).expect("copy capture");
    let pattern = temp.path().join("*.tic");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .success();
}

#[test]
fn glob_matching_several_files_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    fs::copy(clean_capture(), temp.path().join("a.tic")).expect("copy capture");
    fs::copy(clean_capture(), temp.path().join("b.tic")).expect("copy capture");
    let pattern = temp.path().join("*.tic");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("multiple files match"));
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(clean_capture())
        .arg("--stdout")
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(clean_capture())
        .arg("-o")
        .arg(report)
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("capture")
        .arg("decode")
        .arg(clean_capture())
        .arg("-o")
        .arg(report)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not());
}

#[test]
fn list_anomalies_outputs_ids() {
    cmd()
        .arg("capture")
        .arg("decode")
        .arg(noisy_capture())
        .arg("--stdout")
        .arg("--list-anomalies")
        .assert()
        .success()
        .stderr(contains("Anomalies:").and(contains("TIC-RESYNC")).and(contains("record 7")));
}

#[test]
fn strict_fails_when_anomalies_present() {
    cmd()
        .arg("capture")
        .arg("decode")
        .arg(noisy_capture())
        .arg("--stdout")
        .arg("--strict")
        .assert()
        .code(2)
        .stderr(contains("stream anomalies detected"));
}

#[test]
fn strict_ignores_informational_anomalies() {
    // The clean capture only carries an unknown-field notice.
    cmd()
        .arg("capture")
        .arg("decode")
        .arg(clean_capture())
        .arg("--stdout")
        .arg("--strict")
        .assert()
        .success();
}

#[test]
fn batch_flag_changes_published_readings() {
    let assert = cmd()
        .arg("capture")
        .arg("decode")
        .arg(noisy_capture())
        .arg("--stdout")
        .arg("--batch")
        .assert()
        .success();
    let report: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    let fields: Vec<_> = report["readings"]
        .as_array()
        .expect("readings")
        .iter()
        .map(|reading| reading["field"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(fields, vec!["BASE", "PAPP"]);
}

#[test]
fn catalog_lists_known_fields() {
    let assert = cmd().arg("catalog").assert().success();
    let catalog: Value = serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    let entries = catalog.as_array().expect("array");
    assert_eq!(entries.len(), 12);
    assert_eq!(entries[0]["name"], "ADCO");
    let papp = entries
        .iter()
        .find(|entry| entry["name"] == "PAPP")
        .expect("PAPP entry");
    assert_eq!(papp["unit"], "VA");
}

#[test]
fn watch_streams_json_lines_until_max_frames() {
    let assert = cmd()
        .arg("serial")
        .arg("watch")
        .arg(clean_capture())
        .arg("--max-frames")
        .arg("1")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[0]["field"], "ADCO");
    assert!(lines[0]["ts"].is_string());
    let iinst = lines
        .iter()
        .find(|line| line["field"] == "IINST")
        .expect("IINST line");
    assert_eq!(iinst["value"], 2);
    assert_eq!(iinst["unit"], "A");
}

#[test]
fn watch_batch_prints_one_object_per_frame() {
    let assert = cmd()
        .arg("serial")
        .arg("watch")
        .arg(clean_capture())
        .arg("--batch")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0]["ts"].is_string());
    let first = lines[0]["fields"].as_array().expect("fields array");
    assert_eq!(first.len(), 11);
    assert_eq!(first[0]["field"], "ADCO");
    let iinst = lines[1]["fields"]
        .as_array()
        .expect("fields array")
        .iter()
        .find(|field| field["field"] == "IINST")
        .expect("IINST field");
    assert_eq!(iinst["value"], 3);
}

#[test]
fn watch_missing_device_shows_hint() {
    cmd()
        .arg("serial")
        .arg("watch")
        .arg("/dev/does-not-exist-teleinfo")
        .assert()
        .code(2)
        .stderr(contains("device not found").and(contains("hint:")));
}
