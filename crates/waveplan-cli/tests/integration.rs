#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn waveplan(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("waveplan").unwrap();
    cmd.current_dir(dir.path()).env("WAVEPLAN_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    waveplan(dir).arg("init").assert().success();
}

fn write_plan(dir: &TempDir, phase_dir: &str, file: &str, frontmatter: &str) {
    let path = dir.path().join(".planning/phases").join(phase_dir);
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(
        path.join(file),
        format!("---\n{frontmatter}---\n\n# Plan\n\nBody.\n"),
    )
    .unwrap();
}

fn write_intent(dir: &TempDir, body: &str) {
    std::fs::write(dir.path().join(".planning/INTENT.md"), body).unwrap();
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

const INTENT: &str = "# Shop Intent

## Objective

Sell things online.

## Desired Outcomes

- DO-1 [P1]: Customers can check out
- DO-2 [P2]: Orders are emailed
- DO-3 [P3]: Admin sees a dashboard
";

/// Phase 01 with one traced and one untraced plan.
fn drift_fixture(dir: &TempDir) {
    init_project(dir);
    write_intent(dir, INTENT);
    write_plan(dir, "01-shop", "01-01-PLAN.md", "wave: 1\noutcomes: [DO-2]\n");
    write_plan(dir, "01-shop", "01-02-PLAN.md", "wave: 1\n");
}

fn exists(root: &Path, rel: &str) -> bool {
    root.join(rel).exists()
}

// ---------------------------------------------------------------------------
// waveplan init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_planning_tree() {
    let dir = TempDir::new().unwrap();
    waveplan(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .planning/config.yaml"));

    assert!(dir.path().join(".planning/phases").is_dir());
    assert!(dir.path().join(".planning/intent").is_dir());
    assert!(exists(dir.path(), ".planning/config.yaml"));
    assert!(exists(dir.path(), ".planning/INTENT.md"));
}

#[test]
fn init_is_idempotent_and_keeps_edits() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_intent(&dir, INTENT);

    waveplan(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .planning/INTENT.md"));

    let content = std::fs::read_to_string(dir.path().join(".planning/INTENT.md")).unwrap();
    assert_eq!(content, INTENT);
}

// ---------------------------------------------------------------------------
// waveplan phase
// ---------------------------------------------------------------------------

#[test]
fn phase_list_shows_directories_in_order() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "10-later", "10-01-PLAN.md", "wave: 1\n");
    write_plan(&dir, "2-early", "2-01-PLAN.md", "wave: 1\n");

    let v = stdout_json(waveplan(&dir).args(["--json", "phase", "list"]));
    let phases: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["phase"].as_str().unwrap())
        .collect();
    assert_eq!(phases, vec!["02", "10"]);
}

#[test]
fn phase_plans_resolve_numeric_dependencies() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "03-auth", "03-01-PLAN.md", "wave: 1\n");
    write_plan(&dir, "03-auth", "03-02-PLAN.md", "wave: 2\ndepends_on: [1]\n");

    let v = stdout_json(waveplan(&dir).args(["--json", "phase", "plans", "3"]));
    assert_eq!(v["phase"], "03");
    assert_eq!(v["plans"][1]["id"], "02");
    assert_eq!(v["plans"][1]["depends_on"][0], "1");

    let v = stdout_json(waveplan(&dir).args(["--json", "validate", "deps", "3"]));
    assert_eq!(v["verdict"], "clean");
    assert_eq!(v["graph"]["02"][0], "01");
}

#[test]
fn single_digit_plan_files_validate_and_trace() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_intent(&dir, INTENT);
    write_plan(&dir, "05-api", "05-1-PLAN.md", "wave: 1\n");
    write_plan(&dir, "05-api", "05-2-PLAN.md", "wave: 2\ndepends_on: [1]\n");

    waveplan(&dir)
        .args(["validate", "deps", "5", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Verdict: clean"));

    waveplan(&dir)
        .args(["intent", "trace", "5", "1", "DO-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan 05-01 traced to DO-1"));

    let v = stdout_json(waveplan(&dir).args(["--json", "phase", "plans", "5"]));
    assert_eq!(v["plans"][0]["id"], "01");
    assert_eq!(v["plans"][0]["outcome_ids"][0], "DO-1");
}

#[test]
fn phase_plans_unknown_phase_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    waveplan(&dir)
        .args(["phase", "plans", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn plan_without_wave_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "01-x", "01-01-PLAN.md", "depends_on: []\n");
    waveplan(&dir)
        .args(["phase", "plans", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wave"));
}

// ---------------------------------------------------------------------------
// waveplan validate
// ---------------------------------------------------------------------------

#[test]
fn validate_deps_clean_phase() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "03-auth", "03-01-PLAN.md", "wave: 1\n");
    write_plan(&dir, "03-auth", "03-02-PLAN.md", "wave: 2\ndepends_on: [\"03-01\"]\n");

    waveplan(&dir)
        .args(["validate", "deps", "03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No dependency issues."))
        .stdout(predicate::str::contains("Verdict: clean"));
}

#[test]
fn validate_deps_reports_cycle() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "03-auth", "03-01-PLAN.md", "wave: 1\ndepends_on: [\"02\"]\n");
    write_plan(&dir, "03-auth", "03-02-PLAN.md", "wave: 1\ndepends_on: [\"01\"]\n");

    let v = stdout_json(waveplan(&dir).args(["--json", "validate", "deps", "03"]));
    assert_eq!(v["verdict"], "issues_found");
    assert_eq!(v["plan_count"], 2);
    let issues = v["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["type"], "cycle");
    assert_eq!(issues[0]["cycle"], "01 → 02 → 01");
}

#[test]
fn validate_deps_reports_unreachable_and_serialization() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "03-auth", "03-01-PLAN.md", "wave: 2\n");
    write_plan(&dir, "03-auth", "03-02-PLAN.md", "wave: 1\ndepends_on: [\"03-09\"]\n");

    waveplan(&dir)
        .args(["validate", "deps", "03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[unreachable]"))
        .stdout(predicate::str::contains("'03-09'"))
        .stdout(predicate::str::contains("[unnecessary_serialization]"))
        .stdout(predicate::str::contains("Verdict: issues_found"));
}

#[test]
fn validate_waves_reports_shared_file() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(
        &dir,
        "04-api",
        "04-01-PLAN.md",
        "wave: 1\nfiles_modified: [src/lib.rs, src/a.rs]\n",
    );
    write_plan(
        &dir,
        "04-api",
        "04-02-PLAN.md",
        "wave: 1\nfiles_modified: [./src/lib.rs]\n",
    );
    write_plan(
        &dir,
        "04-api",
        "04-03-PLAN.md",
        "wave: 2\ndepends_on: [\"01\"]\nfiles_modified: [src/lib.rs]\n",
    );

    let v = stdout_json(waveplan(&dir).args(["--json", "validate", "waves", "4"]));
    assert_eq!(v["verdict"], "issues_found");
    let conflicts = v["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["wave"], 1);
    assert_eq!(conflicts[0]["file"], "src/lib.rs");
    assert_eq!(v["waves"]["2"][0], "03");
}

#[test]
fn validate_strict_fails_on_issues() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "01-x", "01-01-PLAN.md", "wave: 3\n");

    waveplan(&dir)
        .args(["validate", "all", "1"])
        .assert()
        .success();
    waveplan(&dir)
        .args(["validate", "all", "1", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed validation"));
}

#[test]
fn validate_strict_from_config() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".planning/config.yaml"),
        "version: 1\nproject:\n  name: x\nvalidation:\n  strict: true\n",
    )
    .unwrap();
    write_plan(&dir, "01-x", "01-01-PLAN.md", "wave: 2\n");

    waveplan(&dir)
        .args(["validate", "deps", "1"])
        .assert()
        .failure();
}

#[test]
fn validate_all_clean_phase_passes_strict() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "02-db", "02-01-PLAN.md", "wave: 1\nfiles_modified: [a.rs]\n");
    write_plan(&dir, "02-db", "02-02-PLAN.md", "wave: 1\nfiles_modified: [b.rs]\n");

    let v = stdout_json(waveplan(&dir).args(["-j", "validate", "all", "2", "--strict"]));
    assert_eq!(v["verdict"], "clean");
    assert_eq!(v["waves"]["verdict"], "clean");
    assert_eq!(v["dependencies"]["verdict"], "clean");
}

// ---------------------------------------------------------------------------
// waveplan intent
// ---------------------------------------------------------------------------

#[test]
fn intent_show_lists_outcomes() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_intent(&dir, INTENT);

    waveplan(&dir)
        .args(["intent", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sell things online."))
        .stdout(predicate::str::contains("DO-2"))
        .stdout(predicate::str::contains("P3"));
}

#[test]
fn intent_drift_without_outcomes_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_plan(&dir, "01-x", "01-01-PLAN.md", "wave: 1\n");

    waveplan(&dir)
        .args(["intent", "drift"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No desired outcomes defined"));

    let v = stdout_json(waveplan(&dir).args(["--json", "intent", "drift"]));
    assert_eq!(v["status"], "no_outcomes");
}

#[test]
fn intent_drift_scores_phase() {
    let dir = TempDir::new().unwrap();
    drift_fixture(&dir);

    let v = stdout_json(waveplan(&dir).args(["--json", "intent", "drift", "1"]));
    assert_eq!(v["scope"], "01");
    let result = &v["result"];
    assert_eq!(result["score"], 59);
    assert_eq!(result["alignment"], "moderate");
    assert_eq!(result["components"]["coverage_gap"], 26.7);
    assert_eq!(result["components"]["objective_mismatch"], 12.5);
    assert_eq!(result["components"]["feature_creep"], 0.0);
    assert_eq!(result["components"]["priority_inversion"], 20.0);
    assert_eq!(result["signals"]["untraced_plans"][0], "02");
}

#[test]
fn intent_drift_all_phases_qualifies_plan_ids() {
    let dir = TempDir::new().unwrap();
    drift_fixture(&dir);

    let v = stdout_json(waveplan(&dir).args(["--json", "intent", "drift"]));
    assert_eq!(v["scope"], "all");
    assert_eq!(v["result"]["signals"]["untraced_plans"][0], "01-02");
}

#[test]
fn intent_trace_improves_drift() {
    let dir = TempDir::new().unwrap();
    drift_fixture(&dir);

    waveplan(&dir)
        .args(["intent", "trace", "1", "2", "DO-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("traced to DO-1"));
    assert!(exists(dir.path(), ".planning/intent/trace.json"));

    let v = stdout_json(waveplan(&dir).args(["--json", "intent", "drift", "1"]));
    assert_eq!(v["result"]["score"], 7);
    assert_eq!(v["result"]["alignment"], "excellent");

    waveplan(&dir)
        .args(["intent", "untrace", "1", "02", "DO-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed link"));

    let v = stdout_json(waveplan(&dir).args(["--json", "intent", "drift", "1"]));
    assert_eq!(v["result"]["score"], 59);
}

#[test]
fn intent_trace_unknown_plan_fails() {
    let dir = TempDir::new().unwrap();
    drift_fixture(&dir);

    waveplan(&dir)
        .args(["intent", "trace", "1", "9", "DO-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn intent_trace_rejects_malformed_outcome() {
    let dir = TempDir::new().unwrap();
    drift_fixture(&dir);

    waveplan(&dir)
        .args(["intent", "trace", "1", "1", "outcome-1"])
        .assert()
        .failure();
}

#[test]
fn intent_drift_record_builds_history() {
    let dir = TempDir::new().unwrap();
    drift_fixture(&dir);

    waveplan(&dir)
        .args(["intent", "drift", "1", "--record"])
        .assert()
        .success();
    waveplan(&dir)
        .args(["intent", "trace", "1", "2", "DO-1"])
        .assert()
        .success();
    waveplan(&dir)
        .args(["intent", "drift", "1", "--record"])
        .assert()
        .success()
        .stdout(predicate::str::contains("change since last snapshot: -52"));

    let v = stdout_json(waveplan(&dir).args(["--json", "intent", "history"]));
    let snapshots = v.as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0]["score"], 59);
    assert_eq!(snapshots[1]["score"], 7);

    let v = stdout_json(waveplan(&dir).args(["--json", "intent", "history", "--scope", "all"]));
    assert!(v.as_array().unwrap().is_empty());
}

#[test]
fn intent_drift_without_record_leaves_history_alone() {
    let dir = TempDir::new().unwrap();
    drift_fixture(&dir);

    waveplan(&dir).args(["intent", "drift"]).assert().success();
    assert!(!exists(dir.path(), ".planning/intent/drift-history.json"));
    waveplan(&dir)
        .args(["intent", "history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No drift snapshots recorded."));
}

// ---------------------------------------------------------------------------
// waveplan config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_default_is_clean() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    waveplan(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".planning/config.yaml"),
        "version: 1\nproject:\n  name: x\ndrift:\n  record_history: true\n  max_history: 0\n",
    )
    .unwrap();

    waveplan(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_validate_requires_init() {
    let dir = TempDir::new().unwrap();
    waveplan(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("waveplan init"));
}

#[test]
fn config_show_prints_effective_values() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let v = stdout_json(waveplan(&dir).args(["--json", "config", "show"]));
    assert_eq!(v["drift"]["max_history"], 50);
    assert_eq!(v["validation"]["strict"], false);
}
