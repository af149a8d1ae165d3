//! CLI integration tests
//!
//! End-to-end tests for CLI commands using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vouch_cmd() -> Command {
    let mut cmd = Command::cargo_bin("vouch").unwrap();
    cmd.env_remove("REMOTE_USER")
        .env_remove("REDIRECT_REMOTE_USER")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version_output() {
    vouch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vouch"));
}

#[test]
fn test_help_shows_all_commands() {
    vouch_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_resolve_json() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("vouch.toml");

    let output = vouch_cmd()
        .args(["resolve", "--json", "--var", "REMOTE_USER=jdoe", "-c"])
        .arg(&missing)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["outcome"], "selected");
    assert_eq!(json["session"]["user"], "Jdoe");
}

#[test]
fn test_resolve_without_candidate() {
    let temp_dir = TempDir::new().unwrap();

    vouch_cmd()
        .args(["resolve", "-c"])
        .arg(temp_dir.path().join("vouch.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("no candidate"));
}

#[test]
fn test_resolve_rejects_malformed_var() {
    vouch_cmd()
        .args(["resolve", "--var", "REMOTE_USER"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
}

#[test]
fn test_config_init_then_check() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("vouch.toml");

    vouch_cmd()
        .args(["config", "init", "-o"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));

    vouch_cmd()
        .args(["check", "-c"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("vouch.toml");
    std::fs::write(&config_path, "existing").unwrap();

    vouch_cmd()
        .args(["config", "init", "-o"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_check_reports_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("vouch.toml");
    std::fs::write(&config_path, "[provider]\npriority = 500\n").unwrap();

    vouch_cmd()
        .args(["check", "-c"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider.priority"));
}

#[test]
fn test_check_missing_file_fails() {
    vouch_cmd()
        .args(["check", "-c", "/nonexistent/vouch.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_completions_bash() {
    vouch_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vouch"));
}
