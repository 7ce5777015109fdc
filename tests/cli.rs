//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"logLevel": "warn"}"#).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn lexilog(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("lexilog").unwrap();
        cmd.arg("--store")
            .arg(self.path("store.db"))
            .arg("--config")
            .arg(self.path("config.json"))
            .env_remove("RUST_LOG");
        cmd
    }

    fn import(&self, key: &str, value: serde_json::Value) {
        let file = self.path(&format!("{key}.json"));
        fs::write(&file, value.to_string()).unwrap();
        self.lexilog()
            .args(["import", key])
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("into {key}")));
    }

    fn seed_legacy(&self) {
        self.import(
            "vocabularyWords",
            json!([
                {"id": 1, "english": "cat", "italian": "gatto", "chapter": "animals", "learned": true},
                {"id": 2, "english": "dog", "italian": "cane", "chapter": "animals"},
                {"id": 3, "english": "horse", "italian": "cavallo", "chapter": "animals"},
                {"id": 4, "english": "red", "italian": "rosso", "chapter": "colors"}
            ]),
        );
        self.import(
            "testHistory",
            json!([{
                "id": "t1",
                "timestamp": "2024-06-01T09:30:00Z",
                "totalWords": 3,
                "correctWords": 2,
                "incorrectWords": 1,
                "hintsUsed": 0,
                "chapterStats": {"animals": {"correctWords": 2, "incorrectWords": 1, "percentage": 66.7}}
            }]),
        );
    }
}

fn assert_exists(path: &Path) {
    assert!(path.exists(), "{} should exist", path.display());
}

#[test]
fn chapters_on_empty_store() {
    let ws = Workspace::new();
    ws.lexilog()
        .arg("chapters")
        .assert()
        .success()
        .stdout(predicate::str::contains("no chapters"));
    assert_exists(&ws.path("store.db"));
}

#[test]
fn chapters_table_and_csv() {
    let ws = Workspace::new();
    ws.seed_legacy();

    ws.lexilog()
        .arg("chapters")
        .assert()
        .success()
        .stdout(predicate::str::contains("animals"))
        .stdout(predicate::str::contains("colors"));

    ws.lexilog()
        .args(["chapters", "--csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("chapter,mode,"))
        .stdout(predicate::str::contains("animals,test-centric,3,3,"));
}

#[test]
fn overview_and_trend() {
    let ws = Workspace::new();
    ws.seed_legacy();

    ws.lexilog()
        .arg("overview")
        .assert()
        .success()
        .stdout(predicate::str::contains("chapters: 2 (1 tested)"))
        .stdout(predicate::str::contains("1. animals"));

    ws.lexilog()
        .args(["trend", "animals"])
        .assert()
        .success()
        .stdout(predicate::str::contains("01/06/2024 09:30"))
        .stdout(predicate::str::contains("66.7%"));

    ws.lexilog()
        .args(["trend", "colors"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no tests recorded"));
}

#[test]
fn migrate_once_then_report() {
    let ws = Workspace::new();
    ws.seed_legacy();

    ws.lexilog()
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("no migration report stored"));

    ws.lexilog()
        .args(["migrate", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backup: backup_legacy_"))
        .stdout(predicate::str::contains("tests processed: 1"));

    ws.lexilog()
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("already migrated"));

    ws.lexilog()
        .args(["migrate", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("words processed: 4"));

    ws.lexilog()
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("estimated tests: 1"));
}

#[test]
fn migrate_fails_on_malformed_legacy_data() {
    let ws = Workspace::new();
    ws.import("testHistory", json!({"t1": {"totalWords": 3}}));

    ws.lexilog()
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("fatal:"));
}

#[test]
fn import_rejects_invalid_json() {
    let ws = Workspace::new();
    let file = ws.path("bad.json");
    fs::write(&file, "{ nope").unwrap();

    ws.lexilog()
        .args(["import", "words"])
        .arg(&file)
        .assert()
        .failure();
}
