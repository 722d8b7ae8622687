//! Integration tests: the questlog binary against real task files.
//!
//! Each test copies fixtures into a temp dir, drives the CLI with a fixed
//! clock, then inspects the saved profile and the rewritten task file.

use questlog::Store;
use questlog_core::{BranchId, TaskRecord};
use questlog_engine::EngineConfig;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR")))
}

fn copy_fixture(dir: &Path, name: &str) -> PathBuf {
    let target = dir.join(name);
    std::fs::copy(fixture(name), &target).unwrap_or_else(|e| panic!("Failed to copy fixture {name}: {e}"));
    target
}

fn questlog(dir: &Path, at: &str, args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_questlog"))
        .arg("--profile")
        .arg(dir.join("profile.json"))
        .arg("--config")
        .arg(dir.join("questlog.toml"))
        .arg("--at")
        .arg(at)
        .args(args)
        .env("RUST_LOG", "questlog=warn")
        .output()
        .expect("failed to run questlog");
    assert!(
        output.status.success(),
        "questlog {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn read_task(path: &Path) -> TaskRecord {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================
// complete - plain tasks
// ============================================================

#[test]
fn complete_awards_simple_task_once() {
    let tmp = TempDir::new().unwrap();
    let task_path = copy_fixture(tmp.path(), "simple_task.json");

    let out = stdout(&questlog(tmp.path(), "2026-10-19T09:00", &["complete", task_path.to_str().unwrap()]));
    assert!(out.contains("+100 global XP"), "{out}");

    let profile = Store::new(tmp.path().join("profile.json")).load().unwrap();
    assert_eq!(profile.state.ledger.xp(BranchId::Wisdom), 80);
    assert_eq!(profile.state.ledger.xp(BranchId::Health), 20);
    // task 100 + first-steps 10
    assert_eq!(profile.global_xp, 110);
    assert!(read_task(&task_path).escrow.paid);

    let again = stdout(&questlog(tmp.path(), "2026-10-19T10:00", &["complete", task_path.to_str().unwrap()]));
    assert!(again.contains("Nothing due."));
    let profile = Store::new(tmp.path().join("profile.json")).load().unwrap();
    assert_eq!(profile.global_xp, 110);
}

#[test]
fn complete_tolerates_malformed_task() {
    let tmp = TempDir::new().unwrap();
    let task_path = copy_fixture(tmp.path(), "malformed_task.json");

    questlog(tmp.path(), "2026-10-19T09:00", &["complete", task_path.to_str().unwrap()]);

    let profile = Store::new(tmp.path().join("profile.json")).load().unwrap();
    assert_eq!(profile.state.ledger.xp(BranchId::Health), 15);
    assert_eq!(profile.state.ledger.xp(BranchId::Wisdom), 0);
    assert_eq!(profile.state.counters.lifetime_total, 1);
    let task = read_task(&task_path);
    assert_eq!(task.id, "42");
    assert!(task.escrow.paid);
}

// ============================================================
// complete / plan - milestone escrow
// ============================================================

#[test]
fn milestone_task_pays_in_steps() {
    let tmp = TempDir::new().unwrap();
    let task_path = copy_fixture(tmp.path(), "milestone_task.json");
    let task_arg = task_path.to_str().unwrap();

    let plan = stdout(&questlog(tmp.path(), "2026-10-19T09:00", &["plan", task_arg]));
    assert!(plan.contains("novel:milestone:draft"), "{plan}");
    assert!(!plan.contains("novel:final"));

    questlog(tmp.path(), "2026-10-19T09:05", &["complete", task_arg]);
    let task = read_task(&task_path);
    assert!(task.subtasks[0].paid);
    assert!(!task.escrow.paid);
    let profile = Store::new(tmp.path().join("profile.json")).load().unwrap();
    assert_eq!(profile.state.ledger.xp(BranchId::Craft), 40);
    assert_eq!(profile.state.counters.lifetime_total, 0);

    let mut task = read_task(&task_path);
    task.subtasks[1].done = true;
    std::fs::write(&task_path, serde_json::to_string_pretty(&task).unwrap()).unwrap();

    let out = stdout(&questlog(tmp.path(), "2026-10-19T17:00", &["complete", task_arg]));
    assert!(out.contains("novel:milestone:edit"), "{out}");
    assert!(out.contains("novel:final"), "{out}");
    assert!(out.contains("(bonus 15)"), "{out}");

    let profile = Store::new(tmp.path().join("profile.json")).load().unwrap();
    assert_eq!(profile.state.ledger.xp(BranchId::Craft), 115);
    assert_eq!(profile.state.counters.lifetime_total, 1);
    assert!(read_task(&task_path).escrow.paid);

    let plan = stdout(&questlog(tmp.path(), "2026-10-19T18:00", &["plan", task_arg]));
    assert_eq!(plan, "Nothing due.\n");
}

// ============================================================
// status, decay, init-config
// ============================================================

#[test]
fn decay_command_applies_idle_days() {
    let tmp = TempDir::new().unwrap();
    let task_path = copy_fixture(tmp.path(), "simple_task.json");
    questlog(tmp.path(), "2026-10-19T09:00", &["complete", task_path.to_str().unwrap()]);

    let out = stdout(&questlog(tmp.path(), "2026-10-21T09:00", &["decay"]));
    assert!(out.contains("2 day(s)"), "{out}");
    let profile = Store::new(tmp.path().join("profile.json")).load().unwrap();
    assert_eq!(profile.state.ledger.xp(BranchId::Health), 10);

    let out = stdout(&questlog(tmp.path(), "2026-10-21T10:00", &["decay"]));
    assert!(out.contains("No decay due"));
}

#[test]
fn status_on_fresh_profile() {
    let tmp = TempDir::new().unwrap();
    let out = stdout(&questlog(tmp.path(), "2026-10-19T09:00", &["status"]));
    assert!(out.contains("Level 1"));
    assert!(out.contains("Streak: 0 day(s)"));
}

#[test]
fn init_config_writes_parseable_defaults() {
    let tmp = TempDir::new().unwrap();
    questlog(tmp.path(), "2026-10-19T09:00", &["init-config"]);

    let content = std::fs::read_to_string(tmp.path().join("questlog.toml")).unwrap();
    let config = EngineConfig::parse(&content).unwrap();
    assert_eq!(config.levels.level_step, 100);
}
