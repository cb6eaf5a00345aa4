//! Subtask ledger: the ordered subtasks of a task and the completion ratio
//! derived from them.

use crate::error::AppError;
use crate::model::{ProgressSource, Subtask, Task};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "edit", content = "subtask", rename_all = "snake_case")]
pub enum TextEdit {
    Renamed(Subtask),
    Removed(Subtask),
}

/// Percentage of completed subtasks, rounded. `None` when there are none.
pub fn ratio_percent(subtasks: &[Subtask]) -> Option<u8> {
    if subtasks.is_empty() {
        return None;
    }
    let done = subtasks.iter().filter(|subtask| subtask.completed).count();
    let percent = (done as f64 / subtasks.len() as f64 * 100.0).round();
    Some(percent as u8)
}

/// The subtask ratio, or the task's stored progress when it has no subtasks.
pub fn completion_ratio(task: &Task) -> u8 {
    ratio_percent(&task.subtasks).unwrap_or(task.progress)
}

pub fn all_completed(task: &Task) -> bool {
    !task.subtasks.is_empty() && task.subtasks.iter().all(|subtask| subtask.completed)
}

fn ensure_open(task: &Task) -> Result<(), AppError> {
    if task.completed {
        return Err(AppError::invalid_input("task already completed"));
    }
    Ok(())
}

fn position(task: &Task, subtask_id: &str) -> Result<usize, AppError> {
    let trimmed = subtask_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("subtask id is required"));
    }
    task.subtasks
        .iter()
        .position(|subtask| subtask.id == trimmed)
        .ok_or_else(|| AppError::invalid_input("subtask not found"))
}

fn next_subtask_id(task: &Task, now: i64) -> String {
    let mut counter = task.subtasks.len();
    loop {
        let candidate = format!("subtask_{now}_{counter}");
        if !task.subtasks.iter().any(|subtask| subtask.id == candidate) {
            return candidate;
        }
        counter += 1;
    }
}

pub fn add_subtask(task: &mut Task, text: &str, now: i64) -> Result<Subtask, AppError> {
    ensure_open(task)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("subtask text is required"));
    }

    let subtask = Subtask {
        id: next_subtask_id(task, now),
        text: trimmed.to_string(),
        completed: false,
    };
    task.subtasks.push(subtask.clone());
    Ok(subtask)
}

/// Replaces the text of a subtask. Blank text means delete, with the same
/// protection for completed subtasks as [`delete_subtask`].
pub fn update_subtask_text(
    task: &mut Task,
    subtask_id: &str,
    text: &str,
) -> Result<TextEdit, AppError> {
    ensure_open(task)?;
    let index = position(task, subtask_id)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return delete_subtask(task, subtask_id).map(TextEdit::Removed);
    }

    let subtask = &mut task.subtasks[index];
    subtask.text = trimmed.to_string();
    Ok(TextEdit::Renamed(subtask.clone()))
}

/// Removes an incomplete subtask. Completed subtasks are permanent.
pub fn delete_subtask(task: &mut Task, subtask_id: &str) -> Result<Subtask, AppError> {
    ensure_open(task)?;
    let index = position(task, subtask_id)?;
    if task.subtasks[index].completed {
        return Err(AppError::invalid_input("completed subtasks cannot be deleted"));
    }
    Ok(task.subtasks.remove(index))
}

/// Flips one subtask and re-derives progress from the ratio. Returns true when
/// every subtask is now completed; firing the completion is the caller's job.
pub fn toggle_subtask(task: &mut Task, subtask_id: &str) -> Result<bool, AppError> {
    ensure_open(task)?;
    let index = position(task, subtask_id)?;
    let subtask = &mut task.subtasks[index];
    subtask.completed = !subtask.completed;

    task.progress = completion_ratio(task);
    task.progress_source = ProgressSource::Subtasks;
    Ok(all_completed(task))
}
