//! E2E tests for the `st` binary: init, roster, reads and refresh failures.
//!
//! No test talks to the real event source; refreshes that need the network
//! point at a local port with nothing listening.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn st_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("st"));
    cmd.current_dir(dir);
    cmd.env("SOLVETRACK_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir);
    cmd.env("HOME", dir);
    cmd.env_remove("FORMAT");
    cmd.env_remove("SOLVETRACK_LOG_FORMAT");
    cmd
}

fn init_project() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    st_cmd(dir.path()).arg("init").assert().success();
    dir
}

fn json_of(dir: &Path, args: &[&str]) -> Value {
    let output = st_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("command should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn add_person(dir: &Path, name: &str, handle: &str) -> i64 {
    let person = json_of(dir, &["person", "add", name, handle]);
    person["person_id"].as_i64().expect("person_id")
}

/// Point the event source at a port with nothing listening.
fn use_unreachable_source(dir: &Path) {
    fs::write(
        dir.join(".solvetrack/config.toml"),
        "[source]\nendpoint = \"http://127.0.0.1:9/graphql\"\ntimeout_secs = 2\nfetch_limit = 5\n",
    )
    .expect("write config");
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_state_dir_and_store() {
    let dir = TempDir::new().expect("temp dir");
    st_cmd(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized .solvetrack/"));

    let state = dir.path().join(".solvetrack");
    assert!(state.join("config.toml").is_file());
    assert!(state.join("solvetrack.db").is_file());
    assert!(state.join(".gitignore").is_file());

    let config = fs::read_to_string(state.join("config.toml")).expect("read config");
    assert!(config.contains("[points]"));
}

#[test]
fn second_init_needs_force() {
    let dir = init_project();
    st_cmd(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    st_cmd(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn commands_before_init_report_not_initialized() {
    let dir = TempDir::new().expect("temp dir");
    st_cmd(dir.path())
        .args(["show", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"))
        .stderr(predicate::str::contains("st init"));

    let output = st_cmd(dir.path())
        .args(["leaderboard", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("JSON error");
    assert_eq!(err["error"]["error_code"], "E1001");
}

#[test]
fn broken_config_is_a_parse_error() {
    let dir = init_project();
    fs::write(dir.path().join(".solvetrack/config.toml"), "[source\n").expect("write");
    st_cmd(dir.path())
        .arg("leaderboard")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1002]"));
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[test]
fn new_person_starts_with_zero_stats() {
    let dir = init_project();
    let id = add_person(dir.path(), "Ada Lovelace", "ada_l");

    let shown = json_of(dir.path(), &["show", &id.to_string(), "--solves"]);
    assert_eq!(shown["display_name"], "Ada Lovelace");
    assert_eq!(shown["handle"], "ada_l");
    assert_eq!(shown["total_problems"], 0);
    assert_eq!(shown["current_streak"], 0);
    assert_eq!(shown["longest_streak"], 0);
    assert_eq!(shown["reward_points"], 0);
    assert!(shown["last_solve_date"].is_null());
    assert!(shown["last_refreshed_at_us"].is_null());
    assert_eq!(shown["solves"].as_array().map(Vec::len), Some(0));
}

#[test]
fn blank_display_name_is_rejected() {
    let dir = init_project();
    st_cmd(dir.path())
        .args(["person", "add", "   ", "ada_l"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2003]"));
}

#[test]
fn unknown_person_is_not_found() {
    let dir = init_project();
    st_cmd(dir.path())
        .args(["show", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2001]"));
}

#[test]
fn party_create_join_show_leave() {
    let dir = init_project();
    let ada = add_person(dir.path(), "Ada", "ada_l");
    let bob = add_person(dir.path(), "Bob", "bob_b");

    let party = json_of(
        dir.path(),
        &[
            "party", "create", "Far Future", "--goal", "12", "--starts", "2099-01-01", "--ends",
            "2099-01-31",
        ],
    );
    let party_id = party["party_id"].as_i64().expect("party_id");
    assert_eq!(party["goal"], 12);
    assert!(party["last_bulk_refresh_at_us"].is_null());

    for person in [ada, bob] {
        json_of(
            dir.path(),
            &["party", "join", &person.to_string(), &party_id.to_string()],
        );
    }

    let shown = json_of(dir.path(), &["party", "show", &party_id.to_string()]);
    assert_eq!(shown["name"], "Far Future");
    assert_eq!(shown["status"]["status"], "upcoming");
    assert_eq!(shown["members"].as_array().map(Vec::len), Some(2));
    assert_eq!(shown["progress"]["done"], 0);
    assert_eq!(shown["progress"]["goal"], 12);

    json_of(dir.path(), &["party", "leave", &bob.to_string()]);
    let shown = json_of(dir.path(), &["party", "show", &party_id.to_string()]);
    let members = shown["members"].as_array().cloned().unwrap_or_default();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["person_id"], ada);
}

#[test]
fn inverted_party_window_is_rejected() {
    let dir = init_project();
    st_cmd(dir.path())
        .args([
            "party", "create", "Backwards", "--goal", "5", "--starts", "2024-02-01", "--ends",
            "2024-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2003]"));
}

#[test]
fn joining_unknown_party_fails() {
    let dir = init_project();
    let ada = add_person(dir.path(), "Ada", "ada_l");
    st_cmd(dir.path())
        .args(["party", "join", &ada.to_string(), "77"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2002]"));
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[test]
fn leaderboard_ranks_by_points_then_total() {
    let dir = init_project();
    let ada = add_person(dir.path(), "Ada", "ada_l");
    let bob = add_person(dir.path(), "Bob", "bob_b");
    let cy = add_person(dir.path(), "Cy", "cy_c");

    let conn = rusqlite::Connection::open(dir.path().join(".solvetrack/solvetrack.db"))
        .expect("open store");
    for (id, total, points) in [(ada, 3, 5), (bob, 4, 9), (cy, 5, 5)] {
        conn.execute(
            "UPDATE persons SET total_problems = ?1, reward_points = ?2 WHERE person_id = ?3",
            rusqlite::params![total, points, id],
        )
        .expect("seed stats");
    }
    drop(conn);

    let board = json_of(dir.path(), &["leaderboard"]);
    let rows = board.as_array().cloned().unwrap_or_default();
    let order: Vec<_> = rows
        .iter()
        .map(|row| (row["rank"].as_u64(), row["person"]["handle"].as_str().map(str::to_string)))
        .collect();
    assert_eq!(
        order,
        vec![
            (Some(1), Some("bob_b".to_string())),
            (Some(2), Some("cy_c".to_string())),
            (Some(3), Some("ada_l".to_string())),
        ]
    );

    let top = json_of(dir.path(), &["leaderboard", "--limit", "1"]);
    assert_eq!(top.as_array().map(Vec::len), Some(1));

    st_cmd(dir.path())
        .arg("leaderboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("bob_b"));
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[test]
fn unreachable_source_fails_without_touching_stats() {
    let dir = init_project();
    let ada = add_person(dir.path(), "Ada", "ada_l");
    use_unreachable_source(dir.path());

    let output = st_cmd(dir.path())
        .args(["refresh", &ada.to_string(), "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("JSON error");
    assert_eq!(err["error"]["error_code"], "E3001");

    let shown = json_of(dir.path(), &["show", &ada.to_string()]);
    assert!(shown["last_refreshed_at_us"].is_null());
    assert_eq!(shown["total_problems"], 0);
}

#[test]
fn refresh_all_reports_each_failure() {
    let dir = init_project();
    add_person(dir.path(), "Ada", "ada_l");
    add_person(dir.path(), "Bob", "bob_b");
    use_unreachable_source(dir.path());

    let output = st_cmd(dir.path())
        .args(["refresh", "--all", "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("JSON report");
    assert_eq!(report["succeeded"], 0);
    assert_eq!(report["failed"], 2);
    let outcomes = report["outcomes"].as_array().cloned().unwrap_or_default();
    assert!(outcomes.iter().all(|outcome| outcome["ok"] == false));
    assert!(outcomes.iter().all(|outcome| outcome["step"] == "fetch_events"));

    let err: Value = serde_json::from_slice(&output.stderr).expect("JSON error");
    assert!(
        err["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("2 of 2 refreshes failed"))
    );
}

#[test]
fn refreshing_empty_party_succeeds_and_stamps_it() {
    let dir = init_project();
    use_unreachable_source(dir.path());
    let party = json_of(
        dir.path(),
        &[
            "party", "create", "Solo", "--goal", "1", "--starts", "2024-01-01", "--ends",
            "2024-01-02",
        ],
    );
    let party_id = party["party_id"].as_i64().expect("party_id").to_string();

    let report = json_of(dir.path(), &["party", "refresh", &party_id]);
    assert_eq!(report["succeeded"], 0);
    assert_eq!(report["failed"], 0);

    let shown = json_of(dir.path(), &["party", "show", &party_id]);
    assert!(shown["last_bulk_refresh_at_us"].is_i64());
    assert_eq!(shown["status"]["status"], "completed");
}

#[test]
fn refresh_requires_a_target() {
    let dir = init_project();
    st_cmd(dir.path()).arg("refresh").assert().failure();
}
