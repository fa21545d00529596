//! CLI integration tests
//!
//! Each test runs the binary against its own temporary database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

fn run(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_awareness-cli"))
        .arg("--db")
        .arg(db)
        .args(args)
        .env_remove("AWARENESS_DB")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn write_document(dir: &TempDir, name: &str) -> PathBuf {
    let document = json!({
        "$format": "design-awareness",
        "version": "1.0.0",
        "type": "RealtimeProject",
        "data": {
            "id": "p1",
            "name": name,
            "designModel": {
                "id": "m1",
                "name": "Double Diamond",
                "activities": [{"code": "D", "color": ["ff0000", "00ff00"], "name": "Discover"}]
            },
            "sessions": [{
                "id": "s1",
                "data": [[[0, 10], [20, -1]]],
                "duration": 60,
                "start": "2021-03-01T10:00:00.000Z",
                "notes": []
            }]
        }
    });
    let path = dir.path().join("project.json");
    fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();
    path
}

#[test]
fn test_import_then_list_and_show() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");
    let file = write_document(&dir, "Critique");

    let output = run(&db, &["import", file.to_str().unwrap()]);
    assert!(output.status.success(), "import failed: {:?}", output);
    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["type"], "RealtimeProject");
    assert_eq!(report["exists"], false);

    let output = run(&db, &["ls", "--kind", "RealtimeSession"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("s1"));

    let output = run(&db, &["show", "RealtimeProject", "p1"]);
    assert!(output.status.success());
    let document: Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(document["$format"], "design-awareness");
    assert_eq!(document["data"]["name"], "Critique");

    let output = run(&db, &["recent"]);
    assert!(stdout(&output).starts_with("p1"));
}

#[test]
fn test_dry_run_reports_differences_without_writing() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");
    let file = write_document(&dir, "Critique");
    assert!(run(&db, &["import", file.to_str().unwrap()]).status.success());

    let file = write_document(&dir, "Renamed");
    let output = run(&db, &["import", file.to_str().unwrap(), "--dry-run"]);
    assert!(output.status.success());
    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["exists"], true);
    assert_eq!(report["differingProperties"], json!(["name"]));

    let output = run(&db, &["import", file.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));

    let output = run(&db, &["show", "RealtimeProject", "p1"]);
    let document: Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(document["data"]["name"], "Critique");
}

#[test]
fn test_repair_closes_open_interval() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");
    let file = write_document(&dir, "Critique");
    assert!(run(&db, &["import", file.to_str().unwrap()]).status.success());

    let output = run(&db, &["repair", "s1"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "Repaired session s1");

    let output = run(&db, &["repair", "s1"]);
    assert_eq!(stdout(&output).trim(), "Session s1 needs no repair");
}

#[test]
fn test_missing_entity_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");
    let output = run(&db, &["show", "TimedNote", "nope"]);
    assert_eq!(output.status.code(), Some(1));
}
