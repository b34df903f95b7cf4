//! CLI argument parsing and command tests.
//!
//! Every test uses a scratch project directory so no blockio.toml from the
//! working tree leaks in.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn blockio(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("blockio").unwrap();
    cmd.arg("--project").arg(project.path());
    cmd
}

// ============================================================================
// Informational Commands
// ============================================================================

#[test]
fn version_command_succeeds() {
    Command::cargo_bin("blockio")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Device ABI"));
}

#[test]
fn version_flag_shows_version() {
    Command::cargo_bin("blockio")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("blockio"));
}

#[test]
fn plugins_lists_builtin_posix() {
    let project = TempDir::new().unwrap();
    blockio(&project)
        .args(["--no-color", "plugins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("posix").and(predicate::str::contains("builtin")));
}

#[test]
fn info_reports_configured_settings() {
    let project = TempDir::new().unwrap();
    std::fs::write(
        project.path().join("blockio.toml"),
        "[device.settings]\nqueue_depth = 48\n",
    )
    .unwrap();

    blockio(&project)
        .args(["--no-color", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queue depth").and(predicate::str::contains("48")));
}

#[test]
fn config_show_json() {
    let project = TempDir::new().unwrap();
    blockio(&project)
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"locked_buffers\": \"refuse\""));
}

// ============================================================================
// Transfers
// ============================================================================

#[test]
fn write_then_read_validated() {
    let project = TempDir::new().unwrap();
    let file = project.path().join("scratch.bin");
    let file_arg = file.to_str().unwrap();

    blockio(&project)
        .args(["--no-color", "write", file_arg, "--size", "256K", "--validate", "--async"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 262144 bytes"));
    assert_eq!(std::fs::metadata(&file).unwrap().len(), 262_144);

    blockio(&project)
        .args(["--no-color", "read", file_arg, "--element-type", "f32", "--validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("65536 x f32"));
}

#[test]
fn read_missing_file_fails() {
    let project = TempDir::new().unwrap();
    let file = project.path().join("absent.bin");
    blockio(&project)
        .args(["read", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.bin"));
}

#[test]
fn unknown_device_fails_to_resolve() {
    let project = TempDir::new().unwrap();
    blockio(&project)
        .args(["--device", "null", "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("null"));
}

// ============================================================================
// Argument Parsing Errors
// ============================================================================

#[test]
fn no_command_shows_help() {
    Command::cargo_bin("blockio")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn write_requires_size() {
    Command::cargo_bin("blockio")
        .unwrap()
        .args(["write", "out.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn invalid_size_rejected() {
    Command::cargo_bin("blockio")
        .unwrap()
        .args(["write", "out.bin", "--size", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn invalid_element_type_rejected() {
    Command::cargo_bin("blockio")
        .unwrap()
        .args(["read", "in.bin", "--element-type", "f128"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn invalid_format_rejected() {
    Command::cargo_bin("blockio")
        .unwrap()
        .args(["config", "show", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn unrecognized_command_shows_error() {
    Command::cargo_bin("blockio")
        .unwrap()
        .arg("invalid-command")
        .assert()
        .failure();
}
