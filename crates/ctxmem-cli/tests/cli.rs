//! End-to-end tests that exercise the `ctxmem` binary the way a host
//! assistant or a terminal user would — spawned as a subprocess, reading
//! its stdout. Complements the per-handler logic (which delegates
//! straight to `ctxmem-sdk` and is otherwise untested at this layer) and
//! the `ctxmem-testing` scenario tests, which drive the same storage
//! through `Client` directly rather than through argv/stdin.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::TempDir;

struct Fixture {
    _home: TempDir,
    project_dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            _home: TempDir::new().expect("temp memory home"),
            project_dir: TempDir::new().expect("temp project root"),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("ctxmem").unwrap();
        cmd.arg("--memory-home")
            .arg(self._home.path())
            .arg("--project-root")
            .arg(self.project_dir.path());
        cmd
    }

    fn project_root(&self) -> &std::path::Path {
        self.project_dir.path()
    }
}

#[test]
fn list_on_a_fresh_project_is_empty() {
    let fixture = Fixture::new();

    fixture
        .command()
        .arg("list")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn search_after_process_ingest_finds_the_prompt() {
    let fixture = Fixture::new();

    let request = serde_json::json!({
        "session_id": "s1",
        "cwd": fixture.project_root().to_str().unwrap(),
        "prompt": "prefers dark mode in the editor",
    });

    let mut cmd = Command::cargo_bin("ctxmem").unwrap();
    cmd.arg("process")
        .env("CLAUDE_MEMORY_HOME", fixture._home.path())
        .write_stdin(serde_json::to_vec(&request).unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"context\""));

    fixture
        .command()
        .arg("history")
        .arg("s1")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("dark mode"));

    fixture
        .command()
        .arg("search")
        .arg("dark mode")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("dark mode"));
}

#[test]
fn stats_reports_one_session_after_a_search_ingest_round_trip() {
    let fixture = Fixture::new();

    let request = serde_json::json!({
        "session_id": "s1",
        "cwd": fixture.project_root().to_str().unwrap(),
        "prompt": "remember the deploy runbook lives in docs/deploy.md",
    });
    let mut cmd = Command::cargo_bin("ctxmem").unwrap();
    cmd.arg("process")
        .env("CLAUDE_MEMORY_HOME", fixture._home.path())
        .write_stdin(serde_json::to_vec(&request).unwrap())
        .assert()
        .success();

    fixture
        .command()
        .arg("stats")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"session_count\": 1"));
}

#[test]
fn forget_without_yes_is_rejected_and_history_survives() {
    let fixture = Fixture::new();

    let request = serde_json::json!({
        "session_id": "s1",
        "cwd": fixture.project_root().to_str().unwrap(),
        "prompt": "hello",
    });
    let mut cmd = Command::cargo_bin("ctxmem").unwrap();
    cmd.arg("process")
        .env("CLAUDE_MEMORY_HOME", fixture._home.path())
        .write_stdin(serde_json::to_vec(&request).unwrap())
        .assert()
        .success();

    fixture.command().arg("forget").arg("s1").assert().failure();

    fixture
        .command()
        .arg("history")
        .arg("s1")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"));
}

#[test]
fn import_replays_an_exported_jsonl_batch_idempotently() {
    let fixture = Fixture::new();

    let request = serde_json::json!({
        "session_id": "s1",
        "cwd": fixture.project_root().to_str().unwrap(),
        "prompt": "track this in the export batch",
    });
    let mut cmd = Command::cargo_bin("ctxmem").unwrap();
    cmd.arg("process")
        .env("CLAUDE_MEMORY_HOME", fixture._home.path())
        .write_stdin(serde_json::to_vec(&request).unwrap())
        .assert()
        .success();

    let events = fixture
        .command()
        .arg("history")
        .arg("s1")
        .arg("--json")
        .output()
        .unwrap();
    assert!(events.status.success());

    let batch_dir = TempDir::new().unwrap();
    let batch_path = batch_dir.path().join("batch.jsonl");
    let mut file = std::fs::File::create(&batch_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&events.stdout).unwrap();
    for event in parsed.as_array().unwrap() {
        writeln!(file, "{}", event).unwrap();
    }

    fixture
        .command()
        .arg("import")
        .arg(&batch_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported 0 event(s), skipped 1"));
}
