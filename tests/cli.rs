//! Integration tests for top-level CLI behavior.

use std::path::PathBuf;
use std::process::Command;

fn run_almsync(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_almsync");
    Command::new(bin)
        .args(args)
        .env_remove("ALMSYNC_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run almsync binary")
}

fn write_settings(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("almsync_cli_tests");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const VALID: &str = "\
sde:
  server: https://sde.example.com
  project_id: 1042
alm:
  tool: github
  server: https://api.github.com
  project: acme/app
sync:
  sde_min_priority: 8
  conflict_policy: timestamp
";

#[test]
fn check_accepts_valid_settings() {
    let path = write_settings("valid.yaml", VALID);
    let output = run_almsync(&["check", "--config", path.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Settings OK"));
    assert!(stdout.contains("conflict policy: timestamp"));
    assert!(stdout.contains("min priority: 8"));
}

#[test]
fn check_rejects_gapped_priority_map() {
    let content = format!("{VALID}  alm_priority_map:\n    \"1-5\": Low\n    \"7-10\": High\n");
    let path = write_settings("gapped.yaml", &content);
    let output = run_almsync(&["check", "--config", path.to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("alm_priority_map"));
}

#[test]
fn check_rejects_unknown_conflict_policy() {
    let content = VALID.replace("timestamp", "newest");
    let path = write_settings("policy.yaml", &content);
    let output = run_almsync(&["check", "--config", path.to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("conflict_policy"));
}

#[test]
fn sync_without_credentials_fails_before_connecting() {
    let path = write_settings("nocreds.yaml", VALID);
    let output = Command::new(env!("CARGO_BIN_EXE_almsync"))
        .args(["sync", "--config", path.to_str().unwrap()])
        .env_remove("SDE_API_TOKEN")
        .env_remove("ALM_USER")
        .env_remove("ALM_API_TOKEN")
        .current_dir(std::env::temp_dir())
        .output()
        .expect("failed to run almsync binary");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("SDE_API_TOKEN"));
}

#[test]
fn sync_rejects_invalid_override() {
    let path = write_settings("override.yaml", VALID);
    let output = run_almsync(&[
        "sync",
        "--config",
        path.to_str().unwrap(),
        "--test-connection",
        "world",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("test_connection"));
}

#[test]
fn missing_settings_file_is_reported() {
    let output = run_almsync(&["check", "--config", "/nonexistent/almsync.yaml"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("/nonexistent/almsync.yaml"));
}

#[test]
fn sync_help_lists_overrides() {
    let output = run_almsync(&["sync", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("--start-fresh"));
    assert!(stdout.contains("--conflict-policy"));
    assert!(stdout.contains("--tasks"));
}

#[test]
fn unknown_subcommand_fails() {
    let output = run_almsync(&["plan"]);
    assert!(!output.status.success());
}
