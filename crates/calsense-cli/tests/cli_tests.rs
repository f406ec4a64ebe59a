//! Integration tests for the `calsense` CLI binary.
//!
//! These use `assert_cmd` and `predicates` to exercise the validate, plan, and
//! status subcommands against the JSON fixtures.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn config_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/config.json")
}

fn invalid_config_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/invalid.json")
}

/// Run a subcommand against the fixture config and parse stdout as JSON.
fn json_output(args: &[&str]) -> Value {
    let output = Command::cargo_bin("calsense")
        .unwrap()
        .args(args)
        .args(["--config", config_path()])
        .output()
        .expect("binary must run");
    assert!(output.status.success(), "command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// Validate subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn validate_accepts_fixture() {
    Command::cargo_bin("calsense")
        .unwrap()
        .args(["validate", "--config", config_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));
}

#[test]
fn validate_reports_every_problem() {
    Command::cargo_bin("calsense")
        .unwrap()
        .args(["validate", "--config", invalid_config_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("soon"))
        .stderr(predicate::str::contains("pollingInterval"))
        .stderr(predicate::str::contains("duplicate sensor 'Standup'"));
}

#[test]
fn validate_missing_file_fails() {
    Command::cargo_bin("calsense")
        .unwrap()
        .args(["validate", "--config", "/nonexistent/calsense.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Status subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn status_before_standup_uses_lead_offset() {
    let status = json_output(&["status", "--now", "2026-03-02T08:57:00Z"]);

    assert_eq!(status["Office"]["Office"], Value::Bool(true));
    assert_eq!(status["Office"]["Standup"], Value::Bool(true));
    assert_eq!(status["Office"]["Focus"], Value::Bool(false));
    assert_eq!(status["Home"]["Gym"], Value::Bool(false));
}

#[test]
fn status_during_recurring_instance() {
    let status = json_output(&["status", "--now", "2026-03-03T10:30:00Z"]);

    assert_eq!(status["Office"]["Focus"], Value::Bool(true));
    assert_eq!(status["Office"]["Standup"], Value::Bool(false));
    assert_eq!(status["Office"]["Office"], Value::Bool(true));
}

#[test]
fn status_in_event_timezone() {
    // 18:00 Europe/Berlin on a Monday in March is 17:00 UTC.
    let status = json_output(&["status", "--calendar", "Home", "--now", "2026-03-02T17:30:00Z"]);

    assert_eq!(status["Home"]["Gym"], Value::Bool(true));
    assert!(status.get("Office").is_none());
}

#[test]
fn status_rejects_bad_timestamp() {
    Command::cargo_bin("calsense")
        .unwrap()
        .args(["status", "--config", config_path(), "--now", "tomorrow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RFC 3339"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Plan subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn plan_lists_sorted_actions_with_next_wake() {
    let plan = json_output(&["plan", "--calendar", "Office", "--now", "2026-03-02T08:00:00Z"]);
    let office = &plan["Office"];

    assert_eq!(office["nextWake"], Value::String("2026-03-02T08:55:00Z".to_string()));

    let actions = office["actions"].as_array().expect("actions array");
    // Standup plus the five Focus instances, two actions each.
    assert_eq!(actions.len(), 12);
    assert_eq!(actions[0]["summary"], "Standup");
    assert_eq!(actions[0]["activate"], true);
    assert_eq!(actions[1]["trigger"], "2026-03-02T09:15:00Z");
    assert_eq!(actions[1]["activate"], false);
    assert_eq!(actions[2]["summary"], "Focus block");
    assert_eq!(actions[2]["trigger"], "2026-03-02T09:55:00Z");
}

#[test]
fn plan_drops_expired_actions() {
    let plan = json_output(&["plan", "--calendar", "Office", "--now", "2026-03-02T09:20:00Z"]);
    let actions = plan["Office"]["actions"].as_array().expect("actions array");

    assert_eq!(actions.len(), 10);
    assert!(actions.iter().all(|a| a["summary"] == "Focus block"));
}

#[test]
fn plan_unknown_calendar_fails() {
    Command::cargo_bin("calsense")
        .unwrap()
        .args(["plan", "--config", config_path(), "--calendar", "Garage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no calendar named 'Garage'"));
}
