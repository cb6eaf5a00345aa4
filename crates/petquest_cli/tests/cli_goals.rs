use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const DAY_MS: u128 = 86_400_000;

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("petquest-{nanos}-{file_name}"))
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis()
}

fn petquest(store: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_petquest"))
        .args(args)
        .env("PETQUEST_STORE_PATH", store)
        .env("PETQUEST_CONFIG_PATH", store.with_extension("config.json"))
        .env("PETQUEST_AI_OFFLINE", "1")
        .env("PETQUEST_DISABLE_NOTIFICATIONS", "1")
        .env_remove("PETQUEST_LOG")
        .output()
        .expect("failed to run petquest")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn stored(store: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(store).unwrap()).unwrap()
}

fn add_goal(store: &Path) -> String {
    let output = petquest(
        store,
        &["add", "Meditate", "--goal", "--difficulty", "20", "--skip-check", "--json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let outcome = stdout_json(&output);
    assert_eq!(outcome["task"]["is_goal"], true);
    assert!(outcome["task"]["subtasks"].as_array().unwrap().is_empty());
    outcome["task"]["id"].as_str().unwrap().to_string()
}

#[test]
fn skipping_a_goal_counts_once_per_day() {
    let store = temp_path("goal-skip.json");
    let id = add_goal(&store);

    let skipped = petquest(&store, &["goal", "skip", &id, "--json"]);
    let again = petquest(&store, &["goal", "skip", &id]);
    let history = petquest(&store, &["goal", "history", &id, "--json"]);
    let record = stored(&store);
    std::fs::remove_file(&store).ok();

    let skipped = stdout_json(&skipped);
    assert_eq!(skipped["coins_earned"], 40);
    assert_eq!(skipped["streak"], 1);
    assert_eq!(skipped["entry"]["skipped"], true);
    assert_eq!(again.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&again.stderr).contains("already completed today"));

    let history = stdout_json(&history);
    assert_eq!(history["streak"], 1);
    assert_eq!(history["completed_today"], true);
    assert_eq!(history["entries"].as_array().unwrap().len(), 1);
    assert_eq!(record["pet_data"]["coins"], 40);
    assert_eq!(record["pet_data"]["total_tasks_completed"], 0);
}

#[test]
fn proof_needs_the_ai() {
    let store = temp_path("goal-proof.json");
    let id = add_goal(&store);

    let offline = petquest(&store, &["goal", "proof", &id, "--text", "sat for ten minutes"]);
    let empty = petquest(&store, &["goal", "proof", &id]);
    let record = stored(&store);
    std::fs::remove_file(&store).ok();

    assert_eq!(offline.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&offline.stderr).contains("ERROR: unavailable"));
    assert!(String::from_utf8_lossy(&empty.stderr).contains("ERROR: invalid_input"));
    assert!(record["tasks"][0]["history"].as_array().unwrap().is_empty());
}

#[test]
fn goals_cannot_be_marked_done_directly() {
    let store = temp_path("goal-done.json");
    let id = add_goal(&store);

    let output = petquest(&store, &["done", &id]);
    std::fs::remove_file(&store).ok();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("proof or skip"));
}

#[test]
fn legacy_record_is_upgraded_on_first_write() {
    let store = temp_path("legacy.json");
    let yesterday = now_ms() - DAY_MS;
    let legacy = serde_json::json!({
        "tasks": [
            {
                "id": 1,
                "description": "Run",
                "isGoal": true,
                "difficulty": 10,
                "history": [{ "date": yesterday as f64, "validated": true }]
            },
            {
                "id": 2,
                "description": "Old chore",
                "isCompleted": true
            }
        ],
        "petData": { "name": "Biscuit", "coins": 15 }
    });
    std::fs::write(&store, serde_json::to_string_pretty(&legacy).unwrap()).unwrap();

    let goals = petquest(&store, &["list", "--filter", "goals", "--json"]);
    let before = stored(&store);
    let renamed = petquest(&store, &["pet", "rename", "Rex"]);
    let after = stored(&store);
    std::fs::remove_file(&store).ok();

    let goals = stdout_json(&goals);
    assert_eq!(goals[0]["id"], "1");
    assert_eq!(goals[0]["streak"], 1);
    assert!(before.get("schema_version").is_none());
    assert!(renamed.status.success());
    assert_eq!(after["schema_version"], 2);
    assert_eq!(after["pet_data"]["name"], "Rex");
    assert_eq!(after["pet_data"]["coins"], 15);
    assert_eq!(after["tasks"][1]["progress"], 100);
}

#[test]
fn unknown_schema_version_is_rejected() {
    let store = temp_path("future.json");
    std::fs::write(&store, r#"{"schema_version": 9, "tasks": [], "pet_data": {}}"#).unwrap();

    let output = petquest(&store, &["list"]);
    std::fs::remove_file(&store).ok();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_data"));
}
