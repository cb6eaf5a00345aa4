//! Progress and completion state machine.
//!
//! `NotStarted -> InProgress -> Completed`, where `Completed` is terminal for
//! one-shot tasks. Every path into `Completed` goes through [`complete`], which
//! is guarded by the not-yet-completed precondition, so rewards are paid once.

use crate::coerce::{ParseResult, ProgressAssessment, fallback_assessment};
use crate::economy;
use crate::error::AppError;
use crate::ledger;
use crate::model::{PetData, ProgressSource, Subtask, Task};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionReward {
    pub coins_earned: u64,
    /// Task time credited to the pet's lifetime total.
    pub time_committed_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub subtask: Subtask,
    pub progress: u8,
    pub completion: Option<CompletionReward>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentOutcome {
    pub progress: u8,
    pub explanation: String,
    /// True when the model's answer was not used.
    pub fallback: bool,
    pub notice: Option<String>,
    pub completion: Option<CompletionReward>,
}

/// Fires the completion transition. Rejects goals (they complete through the
/// streak tracker) and tasks that are already completed.
pub fn complete(task: &mut Task, pet: &mut PetData, now: i64) -> Result<CompletionReward, AppError> {
    if task.is_goal {
        return Err(AppError::invalid_input("goals are completed with proof or skip"));
    }
    if task.completed {
        return Err(AppError::invalid_input("task already completed"));
    }

    task.timer.pause(now);
    let time_committed_ms = task.timer.elapsed_time;
    task.completed = true;
    task.progress = 100;
    task.progress_source = ProgressSource::Completion;

    let coins_earned = task.coin_reward();
    pet.total_tasks_completed += 1;
    pet.total_time_spent += time_committed_ms;
    economy::apply_reward(pet, coins_earned);

    info!(task_id = %task.id, coins = coins_earned, "task completed");
    Ok(CompletionReward {
        coins_earned,
        time_committed_ms,
    })
}

/// Completes an open task whose ledger is already fully checked off. Stored
/// records can carry that state; it is settled once, on load.
pub fn settle_finished_ledger(task: &mut Task, pet: &mut PetData, now: i64) -> Option<CompletionReward> {
    if task.completed || task.is_goal || !ledger::all_completed(task) {
        return None;
    }
    complete(task, pet, now).ok()
}

/// Flips a subtask; completes the task when that was the last open one.
pub fn toggle_subtask(
    task: &mut Task,
    pet: &mut PetData,
    subtask_id: &str,
    now: i64,
) -> Result<ToggleOutcome, AppError> {
    let all_done = ledger::toggle_subtask(task, subtask_id)?;
    let subtask = task
        .subtasks
        .iter()
        .find(|subtask| subtask.id == subtask_id.trim())
        .cloned()
        .ok_or_else(|| AppError::invalid_data("subtask vanished during toggle"))?;

    let completion = if all_done && !task.is_goal {
        Some(complete(task, pet, now)?)
    } else {
        None
    };
    debug!(task_id = %task.id, progress = task.progress, "subtask toggled");

    Ok(ToggleOutcome {
        subtask,
        progress: task.progress,
        completion,
    })
}

/// Marks every subtask done and completes the task without consulting the AI.
pub fn mark_all_done(task: &mut Task, pet: &mut PetData, now: i64) -> Result<CompletionReward, AppError> {
    if task.completed {
        return Err(AppError::invalid_input("task already completed"));
    }
    if task.is_goal {
        return Err(AppError::invalid_input("goals are completed with proof or skip"));
    }
    for subtask in &mut task.subtasks {
        subtask.completed = true;
    }
    complete(task, pet, now)
}

/// Applies user checkbox edits made alongside a progress description.
pub fn apply_checked(task: &mut Task, checked: &[(String, bool)]) -> Result<(), AppError> {
    if task.completed {
        return Err(AppError::invalid_input("task already completed"));
    }
    for (id, completed) in checked {
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|subtask| subtask.id == *id)
            .ok_or_else(|| AppError::invalid_input(format!("subtask not found: {id}")))?;
        subtask.completed = *completed;
    }
    Ok(())
}

/// Applies an AI progress assessment, or the deterministic subtask-ratio
/// fallback when `assessment` is `None` (provider unavailable) or a
/// [`ParseResult::Fallback`].
///
/// The reconciled subtask set replaces the current one, except that completed
/// subtasks the model dropped are carried over. If the result leaves every
/// subtask completed the task completes.
pub fn apply_assessment(
    task: &mut Task,
    pet: &mut PetData,
    assessment: Option<ParseResult<ProgressAssessment>>,
    now: i64,
) -> Result<AssessmentOutcome, AppError> {
    if task.completed {
        return Err(AppError::invalid_input("task already completed"));
    }

    let (assessment, fallback, notice) = match assessment {
        Some(ParseResult::Ok(assessment)) => (assessment, false, None),
        Some(ParseResult::Fallback(_)) => (
            fallback_assessment(&task.subtasks),
            true,
            Some("AI response could not be read; progress calculated from completed subtasks.".to_string()),
        ),
        None => (
            fallback_assessment(&task.subtasks),
            true,
            Some("AI assessment unavailable; progress calculated from completed subtasks.".to_string()),
        ),
    };

    if fallback {
        warn!(task_id = %task.id, "progress assessment fell back to subtask ratio");
        task.progress = ledger::completion_ratio(task);
        task.progress_source = ProgressSource::Subtasks;
    } else {
        if !assessment.updated_subtasks.is_empty() {
            task.subtasks = reconcile_subtasks(&task.subtasks, assessment.updated_subtasks);
        }
        task.progress = assessment.progress.min(100);
        task.progress_source = ProgressSource::Assessment;
    }

    let completion = if ledger::all_completed(task) && !task.is_goal {
        Some(complete(task, pet, now)?)
    } else {
        None
    };

    Ok(AssessmentOutcome {
        progress: task.progress,
        explanation: assessment.explanation,
        fallback,
        notice,
        completion,
    })
}

fn reconcile_subtasks(current: &[Subtask], mut updated: Vec<Subtask>) -> Vec<Subtask> {
    for kept in current.iter().filter(|subtask| subtask.completed) {
        match updated.iter_mut().find(|subtask| subtask.id == kept.id) {
            Some(existing) => existing.completed = true,
            None => updated.push(kept.clone()),
        }
    }
    updated
}
