//! Tests for the `kashflow` binary.

mod common;

use common::mock_backend::{MockBackend, MockResponse};
use serde_json::Value;
use std::process::{Command, Output};
use tempfile::TempDir;

fn kashflow_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kashflow"));
    cmd.env_remove("KASHFLOW_LOG");
    cmd
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || {
        kashflow_cmd()
            .args(args)
            .output()
            .expect("Failed to execute command")
    })
    .await
    .unwrap()
}

fn state_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is not JSON"))
        .collect()
}

fn empty_config() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();
    let path = path.to_string_lossy().into_owned();
    (dir, path)
}

#[test]
fn test_help_lists_fetch_command() {
    let output = kashflow_cmd()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("fetch"));
}

#[test]
fn test_malformed_header_is_rejected() {
    let output = kashflow_cmd()
        .args(["fetch", "http://127.0.0.1:1/x", "-H", "no-colon"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected 'name: value'"));
}

#[test]
fn test_invalid_body_is_rejected() {
    let (_dir, config) = empty_config();
    let output = kashflow_cmd()
        .args(["--config", &config, "fetch", "http://127.0.0.1:1/x", "-d", "{oops"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--body is not valid JSON"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_prints_each_state() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::json(r#"{"id": 7}"#)).await;
    let (_dir, config) = empty_config();

    let output = run(vec![
        "--config".to_string(),
        config,
        "fetch".to_string(),
        mock.url("/users/7"),
        "--namespace".to_string(),
        "user".to_string(),
    ])
    .await;

    assert!(output.status.success());
    let states = state_lines(&output);
    assert_eq!(states.first(), Some(&serde_json::json!({})));
    assert_eq!(states[1]["loading"]["user"]["type"], "loading");
    let last = states.last().unwrap();
    assert_eq!(last["user"], serde_json::json!({"id": 7}));
    assert_eq!(last["loading"]["user"]["type"], "success");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_status_with_json_body_is_stored() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::error(404, "missing")).await;
    let (_dir, config) = empty_config();

    let output = run(vec![
        "--config".to_string(),
        config,
        "fetch".to_string(),
        mock.url("/users/9"),
    ])
    .await;

    assert!(output.status.success());
    let last = state_lines(&output).pop().unwrap();
    assert_eq!(last["data"], serde_json::json!({"error": "missing"}));
    assert_eq!(last["loading"]["data"]["type"], "success");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_fetch_exits_with_one() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse {
        status: 500,
        ..MockResponse::text("broken")
    })
    .await;
    let (_dir, config) = empty_config();

    let output = run(vec![
        "--config".to_string(),
        config,
        "fetch".to_string(),
        mock.url("/users"),
    ])
    .await;

    assert_eq!(output.status.code(), Some(1));
    let last = state_lines(&output).pop().unwrap();
    assert_eq!(last["loading"]["data"]["type"], "errored");
    assert_eq!(last["loading"]["data"]["kash"]["kind"], "decode_error");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fail_on_status_flag_marks_error_status_as_failure() {
    let mock = MockBackend::start().await;
    mock.enqueue_response(MockResponse::error(500, "broken")).await;
    let (_dir, config) = empty_config();

    let output = run(vec![
        "--config".to_string(),
        config,
        "fetch".to_string(),
        mock.url("/users"),
        "--fail-on-status".to_string(),
    ])
    .await;

    assert_eq!(output.status.code(), Some(1));
    let last = state_lines(&output).pop().unwrap();
    assert_eq!(last["loading"]["data"]["type"], "errored");
    assert_eq!(last["loading"]["data"]["kash"]["status"], 500);
}
