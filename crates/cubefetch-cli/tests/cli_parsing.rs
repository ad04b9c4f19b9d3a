//! CLI parsing tests for the cubefetch command
//!
//! Tests that verify CLI argument parsing works correctly.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the cubefetch binary
#[allow(deprecated)]
fn cubefetch() -> Command {
    Command::cargo_bin("cubefetch").expect("Failed to find cubefetch binary")
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    cubefetch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    cubefetch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cubefetch"));
}

// ============================================================================
// Global Options Tests
// ============================================================================

#[test]
fn test_global_options_in_help() {
    cubefetch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dir"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--endpoint"))
        .stdout(predicate::str::contains("--operation"));
}

#[test]
fn test_invalid_operation_rejected() {
    cubefetch()
        .args(["--operation", "put", "config", "path"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("endpoint.operation"));
}

#[test]
fn test_missing_subcommand() {
    cubefetch().assert().failure();
}

// ============================================================================
// Fetch Command Tests
// ============================================================================

#[test]
fn test_fetch_help() {
    cubefetch()
        .args(["fetch", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--template"))
        .stdout(predicate::str::contains("--input"))
        .stdout(predicate::str::contains("--var"))
        .stdout(predicate::str::contains("--batch-size"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--no-cache"))
        .stdout(predicate::str::contains("--strict"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_fetch_requires_template() {
    cubefetch()
        .arg("fetch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--template"));
}

#[test]
fn test_fetch_batch_size_must_be_number() {
    cubefetch()
        .args(["fetch", "--template", "q.rq", "--batch-size", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_help() {
    cubefetch()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_config_init_help() {
    cubefetch()
        .args(["config", "init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--global"));
}
