//! Conversion of the version 1 record: camelCase keys, numeric ids, optional
//! everything. Canonical structs never see this shape.

use super::json_store::UserRecord;
use crate::coerce;
use crate::economy;
use crate::error::AppError;
use crate::model::task::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::model::pet::STAT_CEILING;
use crate::model::{HistoryEntry, PetData, ProgressSource, Task, Timer};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    #[serde(default)]
    tasks: Vec<LegacyTask>,
    #[serde(default)]
    pet_data: Option<LegacyPet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTask {
    #[serde(default)]
    id: Value,
    description: String,
    #[serde(default)]
    task_description: Option<String>,
    #[serde(default)]
    difficulty: Option<f64>,
    #[serde(default, alias = "isCompleted")]
    completed: bool,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    subtasks: Vec<Value>,
    #[serde(default)]
    timer: Option<LegacyTimer>,
    #[serde(default)]
    created_at: Option<f64>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    minimized: bool,
    #[serde(default)]
    is_goal: bool,
    #[serde(default)]
    history: Vec<LegacyHistory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTimer {
    #[serde(default)]
    is_running: bool,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    elapsed_time: Option<f64>,
    #[serde(default)]
    last_paused_at: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LegacyHistory {
    date: f64,
    #[serde(default)]
    validated: bool,
    #[serde(default)]
    skipped: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPet {
    name: Option<String>,
    health: Option<f64>,
    happiness: Option<f64>,
    hunger: Option<f64>,
    energy: Option<f64>,
    max_health: Option<f64>,
    max_happiness: Option<f64>,
    coins: Option<f64>,
    inventory: Option<Vec<String>>,
    active_items: Option<Vec<String>>,
    last_stat_update: Option<f64>,
    decay_multiplier: Option<f64>,
    items_used: Option<f64>,
    total_tasks_completed: Option<f64>,
    total_time_spent: Option<f64>,
}

/// Converts a version 1 (or unversioned) record into the canonical shape.
/// Cached goal fields are dropped; they are re-derived on load.
pub fn upgrade_legacy_record(value: Value, now: i64) -> Result<UserRecord, AppError> {
    let legacy: LegacyRecord = serde_json::from_value(value)
        .map_err(|err| AppError::invalid_data(format!("legacy record: {err}")))?;

    let mut seen = HashSet::new();
    let tasks = legacy
        .tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| upgrade_task(task, index, now, &mut seen))
        .collect();

    Ok(UserRecord {
        tasks,
        pet_data: upgrade_pet(legacy.pet_data.unwrap_or_default(), now),
    })
}

fn upgrade_task(legacy: LegacyTask, index: usize, now: i64, seen: &mut HashSet<String>) -> Task {
    let created_at = legacy.created_at.map(|ms| ms as i64).unwrap_or(now);
    let difficulty = legacy
        .difficulty
        .filter(|value| value.is_finite() && *value >= 1.0)
        .map(|value| value.round().clamp(f64::from(MIN_DIFFICULTY), f64::from(MAX_DIFFICULTY)) as u8)
        .unwrap_or(DEFAULT_DIFFICULTY);

    let mut task = Task::new(
        unique_id(&legacy.id, created_at, index, seen),
        legacy.description.trim().to_string(),
        difficulty,
        created_at,
    );
    task.details = legacy.task_description.unwrap_or_default().trim().to_string();
    task.subtasks = coerce::normalize_subtasks(&legacy.subtasks, created_at);
    task.timer = legacy.timer.map(upgrade_timer).unwrap_or_default();
    task.due_date = legacy.due_date.filter(|date| !date.trim().is_empty());
    task.minimized = legacy.minimized;
    task.is_goal = legacy.is_goal;
    task.history = legacy
        .history
        .into_iter()
        .map(|entry| HistoryEntry {
            date: entry.date as i64,
            validated: entry.validated,
            skipped: entry.skipped,
        })
        .collect();

    let progress = legacy.progress.unwrap_or(0.0).round().clamp(0.0, 100.0) as u8;
    if legacy.completed && !legacy.is_goal {
        task.completed = true;
        task.progress = 100;
        task.progress_source = ProgressSource::Completion;
        task.timer.is_running = false;
        task.timer.start_time = None;
    } else if progress > 0 {
        task.progress = progress;
        task.progress_source = ProgressSource::Assessment;
    }
    task
}

fn unique_id(raw: &Value, created_at: i64, index: usize, seen: &mut HashSet<String>) -> String {
    let base = match raw {
        Value::String(id) if !id.trim().is_empty() => id.trim().to_string(),
        Value::Number(id) => id.to_string(),
        _ => format!("task-{created_at}-{index}"),
    };
    let mut candidate = base.clone();
    let mut suffix = 1;
    while !seen.insert(candidate.clone()) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    candidate
}

fn upgrade_timer(legacy: LegacyTimer) -> Timer {
    let start_time = legacy.start_time.map(|ms| ms as i64);
    Timer {
        is_running: legacy.is_running && start_time.is_some(),
        start_time,
        elapsed_time: legacy.elapsed_time.unwrap_or(0.0).max(0.0) as i64,
        last_paused_at: legacy.last_paused_at.map(|ms| ms as i64),
    }
}

fn upgrade_pet(legacy: LegacyPet, now: i64) -> PetData {
    let mut pet = PetData::new(now);
    if let Some(name) = legacy.name.filter(|name| !name.trim().is_empty()) {
        pet.name = name;
    }
    pet.max_health = stat(legacy.max_health, pet.max_health, f64::MAX);
    pet.max_happiness = stat(legacy.max_happiness, pet.max_happiness, f64::MAX);
    pet.health = stat(legacy.health, pet.health, pet.max_health);
    pet.happiness = stat(legacy.happiness, pet.happiness, pet.max_happiness);
    pet.hunger = stat(legacy.hunger, pet.hunger, STAT_CEILING);
    pet.energy = stat(legacy.energy, pet.energy, STAT_CEILING);
    pet.coins = legacy.coins.unwrap_or(0.0).max(0.0) as u64;
    pet.inventory = legacy.inventory.unwrap_or_default();
    pet.active_items = legacy.active_items.unwrap_or_default();
    pet.last_stat_update = legacy.last_stat_update.map(|ms| ms as i64).unwrap_or(now);
    pet.decay_multiplier = stat(legacy.decay_multiplier, 1.0, f64::MAX);
    pet.items_used = legacy.items_used.unwrap_or(0.0).max(0.0) as u32;
    pet.total_tasks_completed = legacy.total_tasks_completed.unwrap_or(0.0).max(0.0) as u32;
    pet.total_time_spent = legacy.total_time_spent.unwrap_or(0.0).max(0.0) as i64;
    economy::refresh_growth(&mut pet);
    pet
}

/// Clamps a stored stat into `[0, max]`; missing or non-finite values take
/// the default.
fn stat(value: Option<f64>, default: f64, max: f64) -> f64 {
    value
        .filter(|value| value.is_finite())
        .map_or(default, |value| value.clamp(0.0, max))
}

#[cfg(test)]
mod tests {
    use super::upgrade_legacy_record;
    use crate::model::ProgressSource;
    use serde_json::json;

    #[test]
    fn upgrades_camel_case_record_with_missing_fields() {
        let legacy = json!({
            "schema_version": 1,
            "tasks": [
                {
                    "id": 1734701234567.25,
                    "description": "  Math homework ",
                    "taskDescription": "chapter 4",
                    "difficulty": 37,
                    "completed": false,
                    "progress": 40,
                    "subtasks": [
                        {"id": "a", "text": "read", "completed": true},
                        {"text": "exercises"}
                    ],
                    "timer": {"isRunning": false, "startTime": null, "elapsedTime": 5000},
                    "createdAt": 1734701234567.0,
                    "dueDate": null
                },
                {
                    "description": "Run",
                    "isGoal": true,
                    "streak": 12,
                    "history": [{"date": 1734701234567.0, "validated": true}]
                }
            ],
            "petData": {"name": "Mochi", "coins": 120, "hunger": 55.5}
        });

        let record = upgrade_legacy_record(legacy, 1_000).unwrap();

        let task = &record.tasks[0];
        assert_eq!(task.id, "1734701234567.25");
        assert_eq!(task.description, "Math homework");
        assert_eq!(task.details, "chapter 4");
        assert_eq!(task.difficulty, 37);
        assert_eq!(task.progress, 40);
        assert_eq!(task.progress_source, ProgressSource::Assessment);
        assert_eq!(task.subtasks.len(), 2);
        assert_eq!(task.subtasks[1].id, "subtask_1734701234567_1");
        assert_eq!(task.timer.elapsed_time, 5000);
        assert_eq!(task.due_date, None);

        let goal = &record.tasks[1];
        assert!(goal.is_goal);
        assert_eq!(goal.difficulty, 50);
        assert_eq!(goal.id, "task-1000-1");
        assert_eq!(goal.history.len(), 1);
        assert_eq!(goal.streak, 0);

        assert_eq!(record.pet_data.name, "Mochi");
        assert_eq!(record.pet_data.coins, 120);
        assert_eq!(record.pet_data.hunger, 55.5);
        assert_eq!(record.pet_data.last_stat_update, 1_000);
    }

    #[test]
    fn completed_legacy_task_is_pinned_at_full_progress() {
        let legacy = json!({
            "tasks": [{"id": "t", "description": "x", "isCompleted": true, "progress": 60,
                       "timer": {"isRunning": true, "startTime": 10}}]
        });

        let record = upgrade_legacy_record(legacy, 0).unwrap();

        let task = &record.tasks[0];
        assert!(task.completed);
        assert_eq!(task.progress, 100);
        assert!(!task.timer.is_running);
    }

    #[test]
    fn legacy_pet_stats_are_clamped() {
        let legacy = json!({
            "petData": {
                "hunger": 150,
                "health": -20,
                "happiness": 300,
                "maxHappiness": 120,
                "energy": 40,
                "decayMultiplier": -0.5
            }
        });

        let pet = upgrade_legacy_record(legacy, 0).unwrap().pet_data;

        assert_eq!(pet.hunger, 100.0);
        assert_eq!(pet.health, 0.0);
        assert_eq!(pet.happiness, 120.0);
        assert_eq!(pet.energy, 40.0);
        assert_eq!(pet.decay_multiplier, 0.0);
    }

    #[test]
    fn duplicate_legacy_ids_are_suffixed() {
        let legacy = json!({
            "tasks": [
                {"id": "same", "description": "a"},
                {"id": "same", "description": "b"}
            ]
        });

        let record = upgrade_legacy_record(legacy, 0).unwrap();

        assert_eq!(record.tasks[0].id, "same");
        assert_eq!(record.tasks[1].id, "same-1");
    }

    #[test]
    fn task_without_description_is_invalid_data() {
        let err = upgrade_legacy_record(json!({"tasks": [{"id": "t"}]}), 0).unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }
}
