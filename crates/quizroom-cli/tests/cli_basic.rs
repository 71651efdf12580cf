//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a scratch directory
//! and verify outputs.

use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_quizroom-cli"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("QUIZROOM_ENV")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_score_quick_tier() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["score", "--correct", "--limit", "20", "--remaining", "20"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "150");
}

#[test]
fn test_score_incorrect_is_zero() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["score", "--limit", "180", "--remaining", "90"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "0");
}

#[test]
fn test_score_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(
        &home,
        &["score", "--correct", "--hint", "--limit", "10", "--remaining", "10", "--json"],
    );
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["score"], 100);
    assert_eq!(parsed["multiplier"], 2.0);
}

#[test]
fn test_config_set_get() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "set", "game.total_rounds", "5"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (code, stdout, _) = run_cli(&home, &["config", "get", "game.total_rounds"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["config", "get", "game.lives"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_path_and_list() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
    assert!(stdout.contains("quizroom"));

    let (code, stdout, _) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["game"]["time_limit_secs"], 180);
    assert_eq!(parsed["themes"]["flags"], true);
}

#[test]
fn test_play_rejects_zero_rounds() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["play", "--rounds", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("total_rounds"));
}
