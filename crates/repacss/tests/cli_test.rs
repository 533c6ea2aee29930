//! Integration tests for the `repacss` CLI binary.
//!
//! These run the binary against CSV fixtures written to temp directories;
//! no telemetry database is needed.
#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `repacss` binary with env isolation.
///
/// Clears the `REPACSS_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn repacss_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("repacss");
    cmd.env("HOME", "/tmp/repacss-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/repacss-cli-test-nonexistent")
        .env_remove("REPACSS_PROFILE")
        .env_remove("REPACSS_OUTPUT")
        .env_remove("REPACSS_TZ")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// One minute at a constant 300 W: 0.005 kWh.
const FLAT_300W: &str = "timestamp,hostname,value,units\n\
    2025-05-01 10:00:00,rpg-93-1,300,W\n\
    2025-05-01 10:00:30,rpg-93-1,300,W\n\
    2025-05-01 10:01:00,rpg-93-1,300,W\n";

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = repacss_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    repacss_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("REPACSS")
            .and(predicate::str::contains("energy"))
            .and(predicate::str::contains("breakdown"))
            .and(predicate::str::contains("table")),
    );
}

#[test]
fn test_version_flag() {
    repacss_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("repacss"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    repacss_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    repacss_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Units and nodes ─────────────────────────────────────────────────

#[test]
fn test_units_converts_milliwatts() {
    repacss_cmd()
        .args(["units", "1500", "mW"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1500 mW = 1.5 W"));
}

#[test]
fn test_units_plain_prints_watts() {
    repacss_cmd()
        .args(["-o", "plain", "units", "2", "kW"])
        .assert()
        .success()
        .stdout("2000\n");
}

#[test]
fn test_units_sql_expression() {
    repacss_cmd()
        .args(["-o", "plain", "units", "sql", "mW", "--column", "reading"])
        .assert()
        .success()
        .stdout("reading / 1000.0 AS value\n");
}

#[test]
fn test_units_without_unit_is_usage_error() {
    let output = repacss_cmd().args(["units", "5"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_nodes_classify_plain() {
    repacss_cmd()
        .args(["-o", "plain", "nodes", "classify", "rpg-93-1", "pdu-91-4", "irc-95-3"])
        .assert()
        .success()
        .stdout("rpg-93-1\th100.idrac\npdu-91-4\tinfra.pdu\nirc-95-3\tinfra.irc\n");
}

#[test]
fn test_nodes_unknown_rack() {
    let output = repacss_cmd().args(["nodes", "rack", "42"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
}

// ── Energy ──────────────────────────────────────────────────────────

#[test]
fn test_energy_integrates_csv() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    repacss_cmd()
        .args(["-o", "plain", "energy", "-H", "rpg-93-1"])
        .arg(&file)
        .assert()
        .success()
        .stdout("0.005\n");
}

#[test]
fn test_energy_json_names_metric() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    repacss_cmd()
        .args(["-o", "json-compact", "energy", "--all-hosts"])
        .arg(&file)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"metric\":\"SystemOutputPower\"")
                .and(predicate::str::contains("\"hostname\":\"rpg-93-1\""))
                .and(predicate::str::contains("\"samples\":3")),
        );
}

#[test]
fn test_energy_missing_file_exits_not_found() {
    let output = repacss_cmd()
        .args(["energy", "-H", "rpg-93-1", "/tmp/repacss-no-such-dump.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_energy_missing_column_exits_input_shape() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(
        dir.path(),
        "broken.csv",
        "timestamp,value\n2025-05-01 10:00:00,300\n",
    );

    let output = repacss_cmd()
        .args(["energy", "-H", "rpg-93-1"])
        .arg(&file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(10));
    assert!(combined_output(&output).contains("hostname"));
}

#[test]
fn test_energy_reports_survivors_when_one_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    let output = repacss_cmd()
        .args(["-o", "plain", "energy", "-H", "rpg-93-1"])
        .arg(&file)
        .arg("/tmp/repacss-no-such-dump.csv")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "0.005\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("warning:"), "Expected a warning:\n{stderr}");
    assert!(stderr.contains("repacss-no-such-dump.csv"));
}

#[test]
fn test_energy_no_boundaries_integrates_data_span() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    repacss_cmd()
        .args([
            "-o",
            "plain",
            "energy",
            "-H",
            "rpg-93-1",
            "--no-boundaries",
            "-s",
            "2025-05-01 09:00:00",
            "-e",
            "2025-05-01 11:00:00",
        ])
        .arg(&file)
        .assert()
        .success()
        .stdout("0.005\n");
}

#[test]
fn test_energy_far_window_drops_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    repacss_cmd()
        .args([
            "energy",
            "-H",
            "rpg-93-1",
            "-s",
            "2025-04-30 00:00:00",
            "-e",
            "2025-05-01 10:01:00",
        ])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("dropped:").and(predicate::str::contains("0.005")));
}

#[test]
fn test_energy_requires_hostname() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    let output = repacss_cmd().arg("energy").arg(&file).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Table ───────────────────────────────────────────────────────────

#[test]
fn test_table_writes_filled_copy() {
    let dir = tempfile::tempdir().unwrap();
    let data = write(dir.path(), "data.csv", FLAT_300W);
    let table = write(
        dir.path(),
        "jobs.csv",
        "Rank,Start time,End time\n1,2025-05-01 10:00:00,2025-05-01 10:01:00\n",
    );

    repacss_cmd()
        .args(["-q", "table", "-H", "rpg-93-1", "-m", "SystemOutputPower"])
        .arg(&table)
        .arg("-d")
        .arg(&data)
        .assert()
        .success();

    let filled = fs::read_to_string(dir.path().join("jobs_filled.csv")).unwrap();
    assert!(filled.starts_with("Rank,Start time,End time,SystemOutputPower (kWh)"));
    assert!(filled.contains("0.005"));
    assert!(dir.path().join("jobs_raw_data.csv").exists());
}

#[test]
fn test_table_warns_on_bad_start_time_and_fills_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let data = write(dir.path(), "data.csv", FLAT_300W);
    let table = write(
        dir.path(),
        "jobs.csv",
        "Rank,Start time,End time\n\
         1,2025-05-01 10:00:00,2025-05-01 10:01:00\n\
         2,not-a-time,2025-05-01 10:01:00\n",
    );

    let output = repacss_cmd()
        .args(["-o", "json-compact", "table", "-H", "rpg-93-1", "-m", "SystemOutputPower"])
        .arg(&table)
        .arg("-d")
        .arg(&data)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"filled\":1"), "Unexpected summary:\n{stdout}");
    assert!(stdout.contains("\"skipped\":1"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("warning: row 2"), "Expected a warning:\n{stderr}");

    let filled = fs::read_to_string(dir.path().join("jobs_filled.csv")).unwrap();
    let lines: Vec<&str> = filled.lines().collect();
    assert!(lines[1].ends_with(",0.005"), "Unexpected row: {}", lines[1]);
    assert_eq!(lines[2], "2,not-a-time,2025-05-01 10:01:00,");
}

// ── Breakdown ───────────────────────────────────────────────────────

#[test]
fn test_breakdown_reports_components() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "SystemOutputPower.csv", FLAT_300W);
    write(
        dir.path(),
        "TotalCPUPower.csv",
        &FLAT_300W.replace(",300,", ",120,"),
    );
    write(dir.path(), "notes.txt", "ignored");

    repacss_cmd()
        .args([
            "-o",
            "json-compact",
            "breakdown",
            "-H",
            "rpg-93-1",
            "-s",
            "2025-05-01 10:00:00",
            "-e",
            "2025-05-01 10:01:00",
            "--no-relationships",
        ])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"hostname\":\"rpg-93-1\"")
                .and(predicate::str::contains("\"component\":\"CPU\""))
                .and(predicate::str::contains("\"system_output\":0.005")),
        );
}

#[test]
fn test_breakdown_without_dir_is_usage_error() {
    let output = repacss_cmd()
        .args(["breakdown", "-H", "h", "-s", "2025-05-01", "-e", "2025-05-02"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Stats ───────────────────────────────────────────────────────────

#[test]
fn test_stats_json_summarizes_host() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    repacss_cmd()
        .args(["-o", "json-compact", "stats", "-H", "rpg-93-1"])
        .arg(&file)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"count\":3")
                .and(predicate::str::contains("\"hostname\":\"rpg-93-1\""))
                .and(predicate::str::contains("\"total_energy_kwh\":0.005")),
        );
}

#[test]
fn test_stats_cumulative_plain_ends_at_total() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    let output = repacss_cmd()
        .args(["-o", "plain", "stats", "-H", "rpg-93-1", "--cumulative"])
        .arg(&file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let totals: Vec<f64> = stdout.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(totals.len(), 3);
    assert!(totals[0].abs() < 1e-12);
    assert!((totals[2] - 0.005).abs() < 1e-12);
}

#[test]
fn test_stats_unknown_host_exits_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "SystemOutputPower.csv", FLAT_300W);

    let output = repacss_cmd()
        .args(["stats", "-H", "rpg-97-9"])
        .arg(&file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_prints_location() {
    repacss_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
