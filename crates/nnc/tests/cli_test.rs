//! Integration tests for the `nnc` CLI binary.
//!
//! Every test runs against the built-in simulated router with HOME and
//! the XDG directories pointed at a private temp dir, so the user's real
//! configuration and telemetry snapshot are never touched.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `nnc` binary isolated inside `home`.
fn nnc_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nnc");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("NNC_CONFIG_FILE")
        .env_remove("NNC_TELEMETRY__COLD_PATH")
        .env_remove("NNC_LOGGING__LEVEL");
    cmd
}

fn sandbox() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn json_lines(output: &std::process::Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = sandbox();
    let output = nnc_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = sandbox();
    nnc_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("watch")
            .and(predicate::str::contains("health"))
            .and(predicate::str::contains("history"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let home = sandbox();
    nnc_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nnc"));
}

#[test]
fn test_zero_count_is_rejected() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args(["watch", "interface", "--interface", "ether1", "--count", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    let home = sandbox();
    let custom = home.path().join("custom.toml");
    nnc_cmd(home.path())
        .args(["config", "path", "--config"])
        .arg(&custom)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let home = sandbox();
    let path = home.path().join("nnc.toml");

    nnc_cmd(home.path())
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .success();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[polling.interface]"), "{written}");

    let output = nnc_cmd(home.path())
        .args(["config", "init", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--force"));

    nnc_cmd(home.path())
        .args(["config", "init", "--force", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_config_show_reflects_env_overrides() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .env("NNC_TELEMETRY__MAX_POINTS", "123")
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["telemetry"]["max_points"], 123);
    assert_eq!(json["polling"]["interface"]["default_secs"], 5);
}

#[test]
fn test_invalid_config_is_a_usage_error() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .env("NNC_POLLING__QUEUE_CAPACITY", "0")
        .args(["config", "show"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("queue_capacity"));

    // path still resolves with a broken config
    nnc_cmd(home.path())
        .env("NNC_POLLING__QUEUE_CAPACITY", "0")
        .args(["config", "path"])
        .assert()
        .success();
}

// ── Watch ───────────────────────────────────────────────────────────

#[test]
fn test_watch_interface_streams_json_lines() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args([
            "watch",
            "interface",
            "--interface",
            "ether1",
            "--interval",
            "1s",
            "--count",
            "2",
            "-o",
            "json-compact",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let points = json_lines(&output);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["router_id"], "sim");
    assert_eq!(points[0]["interface_id"], "ether1");
    assert!(points[1]["tx_bytes"].as_u64() >= points[0]["tx_bytes"].as_u64());
    assert!(points[1]["tx_bytes_per_sec"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_watch_traffic_sums_tunnels() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args([
            "watch", "traffic", "--instance", "tor-1", "--count", "1", "-o", "json-compact",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let points = json_lines(&output);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["instance_id"], "tor-1");
    // two tunnels, each starting above the base counter
    assert!(points[0]["tx_bytes"].as_u64().unwrap() >= 2_000_000);
}

#[test]
fn test_watch_table_prints_header_once() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args([
            "watch",
            "interface",
            "-i",
            "ether2",
            "--interval",
            "1s",
            "-n",
            "2",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("TIME").count(), 1, "{stdout}");
    assert_eq!(stdout.lines().count(), 3, "{stdout}");
}

// ── Health ──────────────────────────────────────────────────────────

#[test]
fn test_health_reports_degraded_link() {
    let home = sandbox();
    nnc_cmd(home.path())
        .args([
            "health",
            "--wan",
            "wan1",
            "--target",
            "1.1.1.1",
            "--target",
            "8.8.8.8",
            "--simulate-down",
            "8.8.8.8",
            "-o",
            "plain",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("DEGRADED\n"));
}

#[test]
fn test_health_json_report() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args(["health", "--wan", "wan2", "--target", "1.1.1.1", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "HEALTHY");
    assert_eq!(json["wan_id"], "wan2");
    assert_eq!(json["targets"][0], "1.1.1.1");
}

#[test]
fn test_health_rejects_blank_target() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args(["health", "--wan", "wan1", "--target", " "])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("blank"));
}

// ── History ─────────────────────────────────────────────────────────

#[test]
fn test_history_after_watch_reads_cold_snapshot() {
    let home = sandbox();
    let cold = home.path().join("cold.json");

    nnc_cmd(home.path())
        .env("NNC_TELEMETRY__COLD_PATH", &cold)
        .args([
            "watch", "interface", "-i", "ether1", "--interval", "1s", "-n", "2",
        ])
        .assert()
        .success();
    assert!(cold.exists(), "cold snapshot was not written");

    let output = nnc_cmd(home.path())
        .env("NNC_TELEMETRY__COLD_PATH", &cold)
        .args(["history", "--resource", "sim:ether1", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tier"], "cold");
    assert_eq!(json["resource_id"], "sim:ether1");
    assert!(!json["points"].as_array().unwrap().is_empty());
}

#[test]
fn test_history_for_unknown_resource_is_empty() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args(["history", "--resource", "sim:nothing", "-o", "json-compact"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["points"].as_array().unwrap().is_empty());
}

#[test]
fn test_history_rejects_bad_interval() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args(["history", "--resource", "sim:ether1", "--interval", "0s"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_history_rejects_inverted_range() {
    let home = sandbox();
    let output = nnc_cmd(home.path())
        .args([
            "history", "--resource", "sim:ether1", "--since", "1h", "--until", "2h",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("time range"));
}
