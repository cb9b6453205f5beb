//! Integration tests for the nightshift binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Two steps, no version control: every probe is `true`.
const QUICK_CONFIG: &str = r#"
mission:
  statement: Exercise the orchestrator
  architecture: Shell only
layout:
  phases: 1
  steps_per_phase: 2
execution:
  max_retries: 2
  checkpoint_every: 1
  health_check_every: 2
  early_steps: 0
  simulated_delay_ms: 0
commands:
  vcs_status: "true"
  vcs_reset: "true"
  stage: "true"
  commit: "true"
phases:
  1: Setup
steps:
  - phase: 1
    step: 1
    description: Create the workspace
    run:
      - command: mkdir -p "${workspace}"
    files:
      - path: notes.txt
        contents: hello
    expect: [notes.txt]
"#;

fn setup_project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join(".nightshift");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.yml"), config).unwrap();
    temp
}

fn snapshot(root: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(root.join(".nightshift/progress.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Resumable, unattended step orchestration"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn run_completes_and_records_progress() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(QUICK_CONFIG);
    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg(temp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("All steps completed"));

    let snap = snapshot(temp.path());
    assert_eq!(snap["completedSteps"], 2);
    assert_eq!(snap["currentPhase"], 2);
    assert_eq!(snap["currentStep"], 1);
    assert_eq!(snap["executionStatus"], "stopped");
    assert_eq!(
        fs::read_to_string(temp.path().join("app/notes.txt"))?,
        "hello"
    );
    assert!(temp.path().join(".nightshift/execution_context.json").exists());
    let log = fs::read_to_string(temp.path().join(".nightshift/execution.log"))?;
    assert!(log.contains("Progress saved"));
    Ok(())
}

#[test]
fn run_subcommand_is_idempotent_after_completion() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(QUICK_CONFIG);
    for _ in 0..2 {
        let mut cmd = Command::new(cargo_bin("nightshift"));
        cmd.arg("run").arg(temp.path());
        cmd.assert().success();
    }
    assert_eq!(snapshot(temp.path())["completedSteps"], 2);
    Ok(())
}

#[test]
fn failing_step_exits_non_zero_and_keeps_position() -> Result<(), Box<dyn std::error::Error>> {
    let config = QUICK_CONFIG.replace("mkdir -p \"${workspace}\"", "false");
    let temp = setup_project(&config);
    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg(temp.path());
    cmd.assert().failure().code(1);

    let snap = snapshot(temp.path());
    assert_eq!(snap["completedSteps"], 0);
    assert_eq!(snap["currentStep"], 1);
    assert_eq!(snap["executionStatus"], "stopped");
    Ok(())
}

#[test]
fn invalid_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let config = QUICK_CONFIG.replace("health_check_every: 2", "health_check_every: 1");
    let temp = setup_project(&config);
    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
    Ok(())
}

#[test]
fn missing_config_override_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg("--config")
        .arg(temp.path().join("absent.yml"))
        .arg(temp.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration not found"));
    Ok(())
}

#[test]
fn status_without_snapshot_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(QUICK_CONFIG);
    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg("status").arg(temp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No progress recorded"));
    assert!(!temp.path().join(".nightshift/progress.json").exists());
    Ok(())
}

#[test]
fn status_json_reports_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(QUICK_CONFIG);
    Command::new(cargo_bin("nightshift"))
        .arg(temp.path())
        .assert()
        .success();

    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg("status").arg(temp.path()).arg("--json");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"completedSteps\": 2"))
        .stdout(predicate::str::contains("\"nextDescription\": \"All steps complete\""));
    Ok(())
}

#[test]
fn completions_generate_for_bash() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("nightshift"));
    cmd.arg("completions").arg("bash");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("nightshift"));
    Ok(())
}
