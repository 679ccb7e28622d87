//! Integration tests for the `th` CLI.
//!
//! Each test starts a mock task store, runs `th` as a subprocess from an
//! empty temp directory, and checks stdout/stderr and the requests made.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use mockito::{Matcher, Mock, Server, ServerGuard};

const TASKS_BODY: &str = r#"[
    {"id": "1", "title": "Buy milk", "isComplete": false},
    {"id": "2", "title": "Pay rent", "isComplete": true, "dueAt": "2025-06-01T00:00:00Z"}
]"#;

/// Get the path to the built `th` binary.
fn th_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_th"))
}

fn mock_list(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/tasks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TASKS_BODY)
        .create()
}

/// Run `th` against `server` from `dir`, returning (stdout, stderr, success).
fn run_th(dir: &Path, server: &ServerGuard, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(th_bin())
        .arg("--api-url")
        .arg(server.url())
        .args(args)
        .current_dir(dir)
        .env_remove("TASK_HERO_API_BASE_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run th");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `th` expecting success, return stdout.
fn run_th_ok(dir: &Path, server: &ServerGuard, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_th(dir, server, args);
    if !success {
        panic!(
            "th {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

// ---------------------------------------------------------------------------
// Read command tests
// ---------------------------------------------------------------------------

#[test]
fn test_list_sorted_by_due_date() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    let list = mock_list(&mut server);

    let out = run_th_ok(tmp.path(), &server, &["list"]);
    list.assert();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "[x] 2  Pay rent  (due 2025-06-01T00:00:00Z)",
            "[ ] 1  Buy milk",
            "",
            "2 of 2 items",
        ]
    );
}

#[test]
fn test_list_text_filter() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    mock_list(&mut server);

    let out = run_th_ok(tmp.path(), &server, &["list", "MILK"]);
    assert!(out.contains("Buy milk"));
    assert!(!out.contains("Pay rent"));
    assert!(out.contains("1 of 2 items"));
}

#[test]
fn test_list_complete_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    mock_list(&mut server);

    let out = run_th_ok(tmp.path(), &server, &["list", "--complete", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["filteredCount"], 1);
    assert_eq!(parsed["totalCount"], 2);
    assert_eq!(parsed["tasks"][0]["id"], "2");
}

#[test]
fn test_list_text_and_filter_can_exclude_everything() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    mock_list(&mut server);

    let out = run_th_ok(tmp.path(), &server, &["list", "milk", "--complete"]);
    assert_eq!(out.trim(), "0 of 2 items");
}

#[test]
fn test_show() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    let show = server
        .mock("GET", "/tasks/7")
        .with_status(200)
        .with_body(r#"{"id": "7", "title": "Plan trip", "isComplete": false, "detail": "flights"}"#)
        .create();

    let out = run_th_ok(tmp.path(), &server, &["show", "7"]);
    show.assert();
    assert!(out.contains("[ ] 7  Plan trip"));
    assert!(out.contains("status: incomplete"));
    assert!(out.contains("  flights"));
}

#[test]
fn test_base_url_from_config_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    let list = mock_list(&mut server);
    fs::write(
        tmp.path().join("task-hero.toml"),
        format!("[api]\nbase_url = \"{}\"\n", server.url()),
    )
    .unwrap();

    let output = Command::new(th_bin())
        .arg("list")
        .current_dir(tmp.path())
        .env_remove("TASK_HERO_API_BASE_URL")
        .output()
        .expect("failed to run th");
    assert!(output.status.success());
    list.assert();
}

// ---------------------------------------------------------------------------
// Write command tests
// ---------------------------------------------------------------------------

#[test]
fn test_add_strips_empty_fields() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    let create = server
        .mock("POST", "/tasks")
        .match_body(Matcher::Json(serde_json::json!({"title": "New task"})))
        .with_status(201)
        .with_body(r#"{"id": "3", "title": "New task", "isComplete": false}"#)
        .create();

    let out = run_th_ok(
        tmp.path(),
        &server,
        &["add", "New task", "--detail", "", "--due", ""],
    );
    create.assert();
    assert_eq!(out.trim(), "created: [ ] 3  New task");
}

#[test]
fn test_add_short_title_is_rejected_locally() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    let create = server.mock("POST", "/tasks").expect(0).create();

    let (_, stderr, success) = run_th(tmp.path(), &server, &["add", "x"]);
    assert!(!success);
    assert!(stderr.contains("error: Title must be at least 2 characters long"));
    create.assert();
}

#[test]
fn test_toggle_sends_full_task() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    mock_list(&mut server);
    let put = server
        .mock("PUT", "/tasks/1")
        .match_body(Matcher::Json(
            serde_json::json!({"id": "1", "title": "Buy milk", "isComplete": true}),
        ))
        .with_status(200)
        .with_body(r#"{"id": "1", "title": "Buy milk", "isComplete": true}"#)
        .create();

    let out = run_th_ok(tmp.path(), &server, &["toggle", "1"]);
    put.assert();
    assert_eq!(out.trim(), "toggled: [x] 1  Buy milk");
}

#[test]
fn test_toggle_missing_task_reports_store_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    mock_list(&mut server);
    server
        .mock("GET", "/tasks/9")
        .with_status(404)
        .with_body(r#"{"message": "Task not found"}"#)
        .create();
    let put = server.mock("PUT", "/tasks/9").expect(0).create();

    let (_, stderr, success) = run_th(tmp.path(), &server, &["toggle", "9"]);
    assert!(!success);
    assert!(stderr.contains("error: Task not found"));
    put.assert();
}

#[test]
fn test_update_sends_form_fields() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    mock_list(&mut server);
    let put = server
        .mock("PUT", "/tasks/1")
        .match_body(Matcher::Json(
            serde_json::json!({"title": "Buy oat milk", "isComplete": true}),
        ))
        .with_status(200)
        .with_body(r#"{"id": "1", "title": "Buy oat milk", "isComplete": true}"#)
        .create();

    let out = run_th_ok(
        tmp.path(),
        &server,
        &["update", "1", "--title", "Buy oat milk", "--complete", "--json"],
    );
    put.assert();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["title"], "Buy oat milk");
    assert_eq!(parsed["isComplete"], true);
}

#[test]
fn test_delete() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    let delete = server.mock("DELETE", "/tasks/2").with_status(204).create();

    let out = run_th_ok(tmp.path(), &server, &["delete", "2"]);
    delete.assert();
    assert_eq!(out.trim(), "deleted: 2");
}

#[test]
fn test_delete_failure_exits_nonzero() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut server = Server::new();
    server
        .mock("DELETE", "/tasks/2")
        .with_status(500)
        .with_body("")
        .create();

    let (stdout, stderr, success) = run_th(tmp.path(), &server, &["delete", "2"]);
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("error: Request failed with status code 500"));
}
