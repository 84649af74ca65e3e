//! End-to-end tests driving the `timetable` binary.
//!
//! Tests the full flow: groups → entry → range edits → timetable → drill-down.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn timetable_binary() -> String {
    env!("CARGO_BIN_EXE_timetable").to_string()
}

/// Writes a config file pointing at a database inside `temp`.
fn write_config(temp: &Path) -> PathBuf {
    let db_file = temp.join("timetable.db");
    let config_file = temp.join("config.toml");
    std::fs::write(
        &config_file,
        format!(
            "database_path = \"{}\"\ndefault_window_ms = 259200000\n",
            db_file.display()
        ),
    )
    .unwrap();
    config_file
}

fn run(temp: &Path, args: &[&str]) -> Output {
    Command::new(timetable_binary())
        .env("HOME", temp)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(temp.join("config.toml"))
        .args(args)
        .output()
        .expect("failed to run timetable")
}

fn run_ok(temp: &Path, args: &[&str]) -> String {
    let output = run(temp, args);
    assert!(
        output.status.success(),
        "timetable {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn run_json(temp: &Path, args: &[&str]) -> Value {
    serde_json::from_str(&run_ok(temp, args)).unwrap()
}

/// Sets up `g1` (alice, bob) and `g2` (alice, higher priority) plus a
/// three-day daily entry; returns its id.
fn seed(temp: &Path) -> String {
    write_config(temp);
    run_ok(temp, &["group", "create", "g1"]);
    run_ok(temp, &["group", "create", "g2"]);
    for (user, group, priority) in [("alice", "g1", "1"), ("alice", "g2", "2"), ("bob", "g1", "1")] {
        run_ok(
            temp,
            &[
                "group", "join", "--user", user, "--group", group, "--priority", priority,
            ],
        );
    }

    let detail = run_json(
        temp,
        &[
            "entry",
            "create",
            "--start",
            "2025-03-03T09:00:00Z",
            "--duration-ms",
            "5400000",
            "--count",
            "3",
            "--repeat-every-ms",
            "86400000",
            "--location",
            "Room 101",
            "--group",
            "g1",
            "g2",
        ],
    );
    assert_eq!(detail["overrides"], serde_json::json!([]));
    detail["id"].as_str().unwrap().to_string()
}

fn timetable(temp: &Path, user: &str) -> Vec<Value> {
    let items = run_json(
        temp,
        &[
            "timetable",
            "--user",
            user,
            "--start",
            "2025-03-03T00:00:00Z",
            "--json",
        ],
    );
    items.as_array().unwrap().clone()
}

#[test]
fn test_timetable_lists_occurrences() {
    let temp = TempDir::new().unwrap();
    let entry_id = seed(temp.path());

    let items = timetable(temp.path(), "bob");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["occurrenceId"], format!("0@{entry_id}"));
    assert_eq!(items[0]["start"], "2025-03-03T09:00:00.000Z");
    assert_eq!(items[0]["end"], "2025-03-03T10:30:00.000Z");
    assert_eq!(items[2]["start"], "2025-03-05T09:00:00.000Z");
}

#[test]
fn test_group_scoped_update_and_drill_down() {
    let temp = TempDir::new().unwrap();
    let entry_id = seed(temp.path());

    run_ok(
        temp.path(),
        &[
            "entry", "update", &entry_id, "--user", "alice", "--from", "1", "--until", "2",
            "--for", "g2", "--location", "Lab",
        ],
    );

    let alice = timetable(temp.path(), "alice");
    let locations: Vec<&str> = alice.iter().map(|i| i["location"].as_str().unwrap()).collect();
    assert_eq!(locations, vec!["Room 101", "Lab", "Lab"]);

    let bob = timetable(temp.path(), "bob");
    assert!(bob.iter().all(|i| i["location"] == "Room 101"));

    let override_occurrence = alice[2]["occurrenceId"].as_str().unwrap();
    assert!(override_occurrence.starts_with("1@"));
    let detail = run_json(
        temp.path(),
        &["occurrence", override_occurrence, "--user", "alice"],
    );
    assert_eq!(detail["id"], entry_id.as_str());
    assert_eq!(detail["overrides"][0]["location"], "Lab");

    // bob cannot see g2's override
    let detail = run_json(temp.path(), &["entry", "show", &entry_id, "--user", "bob"]);
    assert_eq!(detail["overrides"], serde_json::json!([]));
}

#[test]
fn test_delete_range_hides_occurrence() {
    let temp = TempDir::new().unwrap();
    let entry_id = seed(temp.path());

    run_ok(
        temp.path(),
        &[
            "entry",
            "delete-range",
            &entry_id,
            "--user",
            "bob",
            "--from",
            "0",
            "--until",
            "2",
            "--every",
            "2",
            "--for",
            "g1",
        ],
    );

    let bob = timetable(temp.path(), "bob");
    assert_eq!(bob.len(), 1);
    assert_eq!(bob[0]["start"], "2025-03-04T09:00:00.000Z");
}

#[test]
fn test_errors_exit_nonzero() {
    let temp = TempDir::new().unwrap();
    let entry_id = seed(temp.path());

    let output = run(temp.path(), &["occurrence", "zero@nothing", "--user", "bob"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed input"), "stderr: {stderr}");

    let output = run(temp.path(), &["entry", "show", &entry_id, "--user", "mallory"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {stderr}");

    let output = run(
        temp.path(),
        &[
            "entry", "delete-range", &entry_id, "--user", "bob", "--from", "0", "--until", "0",
            "--for", "g3",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("conflict"), "stderr: {stderr}");
}

#[test]
fn test_status_reports_counts() {
    let temp = TempDir::new().unwrap();
    seed(temp.path());

    let output = run_ok(temp.path(), &["status"]);
    assert!(output.contains("Groups: 2"), "{output}");
    assert!(output.contains("Memberships: 3"), "{output}");
    assert!(output.contains("Entries: 1"), "{output}");
}
