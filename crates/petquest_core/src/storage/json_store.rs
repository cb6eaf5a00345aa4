use crate::config;
use crate::economy;
use crate::error::AppError;
use crate::model::task::{MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::model::{PetData, Task};
use crate::progress;
use crate::storage::legacy;
use crate::streak;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use time::UtcOffset;
use tracing::{debug, info};

pub const SCHEMA_VERSION: u32 = 2;
const STORE_FILE_NAME: &str = "record.json";
const STORE_ENV_VAR: &str = "PETQUEST_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    schema_version: u32,
    tasks: Vec<Task>,
    pet_data: PetData,
}

/// Everything one user owns: the task list and the pet.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub tasks: Vec<Task>,
    pub pet_data: PetData,
}

impl UserRecord {
    pub fn new(now: i64) -> Self {
        Self {
            tasks: Vec::new(),
            pet_data: PetData::new(now),
        }
    }

    pub fn task(&self, id: &str) -> Result<&Task, AppError> {
        let trimmed = require_id(id)?;
        self.tasks
            .iter()
            .find(|task| task.id == trimmed)
            .ok_or_else(|| AppError::invalid_input("task not found"))
    }

    pub fn task_mut(&mut self, id: &str) -> Result<&mut Task, AppError> {
        let trimmed = require_id(id)?;
        self.tasks
            .iter_mut()
            .find(|task| task.id == trimmed)
            .ok_or_else(|| AppError::invalid_input("task not found"))
    }

    /// Borrows a task and the pet at once, for operations that pay rewards.
    pub fn task_and_pet(&mut self, id: &str) -> Result<(&mut Task, &mut PetData), AppError> {
        let trimmed = require_id(id)?;
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == trimmed)
            .ok_or_else(|| AppError::invalid_input("task not found"))?;
        Ok((task, &mut self.pet_data))
    }
}

fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    Ok(config::app_dir()?.join(STORE_FILE_NAME))
}

/// Loads the record and brings it up to `now`: pet decay is applied, cached
/// goal streaks are re-derived from history and open tasks with every
/// subtask done are completed.
pub fn load_record(path: &Path, now: i64, offset: UtcOffset) -> Result<UserRecord, AppError> {
    let mut record = read_record(path, now)?;
    economy::apply_decay(&mut record.pet_data, now);
    for task in &mut record.tasks {
        streak::refresh_goal(task, now, offset);
        if progress::settle_finished_ledger(task, &mut record.pet_data, now).is_some() {
            info!(task_id = %task.id, "completed task with finished subtasks");
        }
    }
    Ok(record)
}

/// Reads the stored record as-is. A missing file is a fresh user.
pub fn read_record(path: &Path, now: i64) -> Result<UserRecord, AppError> {
    if !path.exists() {
        debug!(path = %path.display(), "no record yet, starting fresh");
        return Ok(UserRecord::new(now));
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let value: Value =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    let record = match value.get("schema_version").map(Value::as_u64) {
        Some(Some(version)) if version == u64::from(SCHEMA_VERSION) => {
            let stored: StoredRecord = serde_json::from_value(value)
                .map_err(|err| AppError::invalid_data(err.to_string()))?;
            UserRecord {
                tasks: stored.tasks,
                pet_data: stored.pet_data,
            }
        }
        Some(Some(1)) | None => {
            info!(path = %path.display(), "upgrading legacy record");
            legacy::upgrade_legacy_record(value, now)?
        }
        _ => return Err(AppError::invalid_data("schema_version mismatch")),
    };

    validate(&record)?;
    Ok(record)
}

fn validate(record: &UserRecord) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for task in &record.tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(AppError::invalid_data(format!("duplicate task id: {}", task.id)));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&task.difficulty) {
            return Err(AppError::invalid_data(format!(
                "difficulty out of range for {}",
                task.id
            )));
        }
        if task.progress > 100 {
            return Err(AppError::invalid_data(format!("progress out of range for {}", task.id)));
        }
    }
    Ok(())
}

pub fn save_record(path: &Path, record: &UserRecord) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredRecord {
        schema_version: SCHEMA_VERSION,
        tasks: record.tasks.clone(),
        pet_data: record.pet_data.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}
