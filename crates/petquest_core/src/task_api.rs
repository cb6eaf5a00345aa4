use crate::ai::{Assistant, MediaInput, Proof, Transcriber, transcript_or_error};
use crate::clock::Clock;
use crate::coerce::{ProofVerdict, TaskDraft, default_subtasks};
use crate::error::AppError;
use crate::ledger::{self, TextEdit};
use crate::model::task::{MAX_DIFFICULTY, MIN_DIFFICULTY, parse_due_date};
use crate::model::{HistoryEntry, PetData, ProgressSource, Subtask, Task};
use crate::notify::{Notifier, Reminder, activation_argument, due_reminders, notifier_from_env};
use crate::progress::{self, AssessmentOutcome, CompletionReward, ToggleOutcome};
use crate::storage::json_store::{self, UserRecord};
use crate::streak::{self, GoalCompletion, GoalProof};
use crate::timer::{self, PauseCheckpoint};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub description: String,
    pub details: String,
    /// Skips the AI rating when set.
    pub difficulty: Option<u8>,
    pub is_goal: bool,
    pub due_date: Option<String>,
    pub check_completeness: bool,
    pub with_subtasks: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddOutcome {
    Created { task: Task, notices: Vec<String> },
    /// The description was too vague; nothing was saved.
    NeedsMoreInfo { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceOutcome {
    pub transcript: String,
    pub draft: TaskDraft,
    pub draft_fallback: bool,
    pub outcome: AddOutcome,
}

/// Result of an operation that waited on the AI. The record may have changed
/// while the call was in flight; a result for a task that is gone or already
/// finished is dropped rather than applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum AiApplied<T> {
    Applied(T),
    Dropped { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    Open,
    All,
    Goals,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtaskRemoval {
    pub removed: Subtask,
    pub completion: Option<CompletionReward>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerChange {
    pub task: Task,
    pub changed: bool,
    pub committed_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProofOutcome {
    pub verdict: ProofVerdict,
    pub fallback: bool,
    pub completion: Option<GoalCompletion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalHistory {
    pub task_id: String,
    pub description: String,
    pub streak: u32,
    pub last_completed: Option<i64>,
    pub completed_today: bool,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug)]
pub struct NotificationOutcome {
    pub reminders: Vec<Reminder>,
    pub failures: Vec<NotificationFailure>,
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub task_id: String,
    pub error: AppError,
}

pub fn add_task(request: NewTask, assistant: &Assistant<'_>) -> Result<AddOutcome, AppError> {
    let path = json_store::store_path()?;
    add_task_with_path(&path, request, assistant, Clock::system())
}

pub fn add_task_from_voice(
    audio: &MediaInput,
    transcriber: &dyn Transcriber,
    assistant: &Assistant<'_>,
) -> Result<VoiceOutcome, AppError> {
    let transcript = transcript_or_error(transcriber, audio)?;
    add_task_from_transcript(&transcript, assistant)
}

pub fn add_task_from_transcript(
    transcript: &str,
    assistant: &Assistant<'_>,
) -> Result<VoiceOutcome, AppError> {
    let path = json_store::store_path()?;
    add_task_from_transcript_with_path(&path, transcript, assistant, Clock::system())
}

pub fn list_tasks(filter: ListFilter) -> Result<Vec<Task>, AppError> {
    let path = json_store::store_path()?;
    list_tasks_with_path(&path, filter, Clock::system())
}

pub fn get_task_by_id(id: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    get_task_by_id_with_path(&path, id, Clock::system())
}

pub fn edit_task(id: &str, description: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    edit_task_with_path(&path, id, description, Clock::system())
}

pub fn set_details(id: &str, details: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    set_details_with_path(&path, id, details, Clock::system())
}

pub fn set_due_date(id: &str, due_date: Option<&str>) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    set_due_date_with_path(&path, id, due_date, Clock::system())
}

pub fn set_minimized(id: &str, minimized: bool) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    set_minimized_with_path(&path, id, minimized, Clock::system())
}

pub fn delete_task(id: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    delete_task_with_path(&path, id, Clock::system())
}

pub fn generate_subtasks(id: &str, assistant: &Assistant<'_>) -> Result<AiApplied<Vec<Subtask>>, AppError> {
    let path = json_store::store_path()?;
    generate_subtasks_with_path(&path, id, assistant, Clock::system())
}

pub fn add_subtask(id: &str, text: &str) -> Result<Subtask, AppError> {
    let path = json_store::store_path()?;
    add_subtask_with_path(&path, id, text, Clock::system())
}

pub fn edit_subtask(id: &str, subtask_id: &str, text: &str) -> Result<TextEdit, AppError> {
    let path = json_store::store_path()?;
    edit_subtask_with_path(&path, id, subtask_id, text, Clock::system())
}

pub fn delete_subtask(id: &str, subtask_id: &str) -> Result<SubtaskRemoval, AppError> {
    let path = json_store::store_path()?;
    delete_subtask_with_path(&path, id, subtask_id, Clock::system())
}

pub fn toggle_subtask(id: &str, subtask_id: &str) -> Result<ToggleOutcome, AppError> {
    let path = json_store::store_path()?;
    toggle_subtask_with_path(&path, id, subtask_id, Clock::system())
}

pub fn assess_progress(
    id: &str,
    note: &str,
    checked: &[(String, bool)],
    assistant: &Assistant<'_>,
) -> Result<AiApplied<AssessmentOutcome>, AppError> {
    let path = json_store::store_path()?;
    assess_progress_with_path(&path, id, note, checked, assistant, Clock::system())
}

pub fn mark_done(id: &str) -> Result<CompletionReward, AppError> {
    let path = json_store::store_path()?;
    mark_done_with_path(&path, id, Clock::system())
}

pub fn start_timer(id: &str) -> Result<TimerChange, AppError> {
    let path = json_store::store_path()?;
    start_timer_with_path(&path, id, Clock::system())
}

pub fn pause_timer(id: &str, checkpoint: &mut dyn PauseCheckpoint) -> Result<TimerChange, AppError> {
    let path = json_store::store_path()?;
    pause_timer_with_path(&path, id, checkpoint, Clock::system())
}

pub fn submit_goal_proof(
    id: &str,
    proof: &Proof,
    assistant: &Assistant<'_>,
) -> Result<AiApplied<ProofOutcome>, AppError> {
    let path = json_store::store_path()?;
    submit_goal_proof_with_path(&path, id, proof, assistant, Clock::system())
}

pub fn skip_goal(id: &str) -> Result<GoalCompletion, AppError> {
    let path = json_store::store_path()?;
    skip_goal_with_path(&path, id, Clock::system())
}

pub fn goal_history(id: &str) -> Result<GoalHistory, AppError> {
    let path = json_store::store_path()?;
    goal_history_with_path(&path, id, Clock::system())
}

pub fn notify_reminders() -> Result<NotificationOutcome, AppError> {
    let path = json_store::store_path()?;
    let notifier = notifier_from_env()?;
    notify_reminders_with_path(&path, notifier.as_ref(), Clock::system())
}

pub(crate) fn load(path: &Path, clock: Clock) -> Result<UserRecord, AppError> {
    json_store::load_record(path, clock.now, clock.offset)
}

/// Read-modify-write of the single record. Nothing is saved unless `apply`
/// succeeds.
pub(crate) fn mutate<T>(
    path: &Path,
    clock: Clock,
    apply: impl FnOnce(&mut UserRecord) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut record = load(path, clock)?;
    let result = apply(&mut record)?;
    json_store::save_record(path, &record)?;
    Ok(result)
}

fn stale_reason(record: &UserRecord, id: &str) -> Option<String> {
    match record.task(id) {
        Err(_) => Some("task was deleted while the AI was working".to_string()),
        Ok(task) if task.completed => {
            Some("task was completed while the AI was working".to_string())
        }
        Ok(_) => None,
    }
}

fn next_task_id(record: &UserRecord, now: i64) -> String {
    let base = format!("task-{now}");
    let mut candidate = base.clone();
    let mut suffix = 1;
    while record.tasks.iter().any(|task| task.id == candidate) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    candidate
}

fn normalize_due_date(raw: Option<&str>, clock: Clock) -> Result<Option<String>, AppError> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if parse_due_date(trimmed, clock.offset).is_none() {
        return Err(AppError::invalid_input(
            "due date must be RFC3339 or YYYY-MM-DD",
        ));
    }
    Ok(Some(trimmed.to_string()))
}

fn add_task_with_path(
    path: &Path,
    request: NewTask,
    assistant: &Assistant<'_>,
    clock: Clock,
) -> Result<AddOutcome, AppError> {
    let description = request.description.trim();
    if description.is_empty() {
        return Err(AppError::invalid_input("description is required"));
    }
    let details = request.details.trim();
    let due_date = normalize_due_date(request.due_date.as_deref(), clock)?;
    if let Some(value) = request.difficulty
        && !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&value)
    {
        return Err(AppError::invalid_input("difficulty must be between 1 and 100"));
    }

    let mut notices = Vec::new();
    if request.check_completeness && details.is_empty() {
        match assistant.check_completeness(description) {
            Ok(check) => {
                let check = check.into_inner();
                if check.needs_more_info {
                    return Ok(AddOutcome::NeedsMoreInfo {
                        message: check.message.unwrap_or_default(),
                    });
                }
            }
            Err(err) if err.is_recoverable() => {
                notices.push("Completeness check skipped: AI unavailable.".to_string());
            }
            Err(err) => return Err(err),
        }
    }

    let prompt_text = if details.is_empty() {
        description.to_string()
    } else {
        format!("{description} {details}")
    };

    let difficulty = match request.difficulty {
        Some(value) => value,
        None => {
            let rating = assistant.rate_difficulty(&prompt_text)?;
            if rating.is_fallback() {
                notices.push("AI rating was unreadable; difficulty set to 50.".to_string());
            }
            rating.into_inner()
        }
    };

    let subtasks = if request.is_goal || !request.with_subtasks {
        Vec::new()
    } else {
        match assistant.generate_subtasks(&prompt_text, clock.now) {
            Ok(generated) => {
                if generated.is_fallback() {
                    notices.push("AI subtasks were unreadable; default subtasks added.".to_string());
                }
                generated.into_inner()
            }
            Err(err) if err.is_recoverable() => {
                notices.push("AI unavailable; default subtasks added.".to_string());
                default_subtasks(clock.now)
            }
            Err(err) => return Err(err),
        }
    };

    let is_goal = request.is_goal;
    let task = mutate(path, clock, |record| {
        let mut task = Task::new(
            next_task_id(record, clock.now),
            description.to_string(),
            difficulty,
            clock.now,
        );
        task.details = details.to_string();
        task.subtasks = subtasks;
        task.due_date = due_date;
        task.is_goal = is_goal;
        record.tasks.push(task.clone());
        Ok(task)
    })?;

    info!(task_id = %task.id, difficulty, is_goal, "task added");
    Ok(AddOutcome::Created { task, notices })
}

fn add_task_from_transcript_with_path(
    path: &Path,
    transcript: &str,
    assistant: &Assistant<'_>,
    clock: Clock,
) -> Result<VoiceOutcome, AppError> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(AppError::invalid_input("no speech detected in audio"));
    }

    let drafted = assistant.draft_task(transcript)?;
    let draft_fallback = drafted.is_fallback();
    let draft = drafted.into_inner();

    let due_date = match normalize_due_date(draft.due_date.as_deref(), clock) {
        Ok(value) => value,
        Err(_) => {
            warn!(due_date = ?draft.due_date, "drafted due date unreadable, dropped");
            None
        }
    };

    let request = NewTask {
        description: draft.title.clone(),
        details: draft.description.clone(),
        difficulty: Some(draft.difficulty),
        is_goal: draft.is_goal,
        due_date,
        check_completeness: false,
        with_subtasks: true,
    };
    let outcome = add_task_with_path(path, request, assistant, clock)?;

    Ok(VoiceOutcome {
        transcript: transcript.to_string(),
        draft,
        draft_fallback,
        outcome,
    })
}

fn list_tasks_with_path(path: &Path, filter: ListFilter, clock: Clock) -> Result<Vec<Task>, AppError> {
    let record = load(path, clock)?;
    Ok(record
        .tasks
        .into_iter()
        .filter(|task| match filter {
            ListFilter::All => true,
            ListFilter::Open => !task.completed,
            ListFilter::Goals => task.is_goal,
            ListFilter::Completed => task.completed,
        })
        .collect())
}

fn get_task_by_id_with_path(path: &Path, id: &str, clock: Clock) -> Result<Task, AppError> {
    let record = load(path, clock)?;
    record.task(id).cloned()
}

fn edit_task_with_path(path: &Path, id: &str, description: &str, clock: Clock) -> Result<Task, AppError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("description is required"));
    }
    mutate(path, clock, |record| {
        let task = record.task_mut(id)?;
        task.description = trimmed.to_string();
        Ok(task.clone())
    })
}

fn set_details_with_path(path: &Path, id: &str, details: &str, clock: Clock) -> Result<Task, AppError> {
    mutate(path, clock, |record| {
        let task = record.task_mut(id)?;
        task.details = details.trim().to_string();
        Ok(task.clone())
    })
}

fn set_due_date_with_path(
    path: &Path,
    id: &str,
    due_date: Option<&str>,
    clock: Clock,
) -> Result<Task, AppError> {
    let normalized = normalize_due_date(due_date, clock)?;
    mutate(path, clock, |record| {
        let task = record.task_mut(id)?;
        if task.is_goal && normalized.is_some() {
            return Err(AppError::invalid_input("goals repeat daily and take no due date"));
        }
        task.due_date = normalized;
        Ok(task.clone())
    })
}

fn set_minimized_with_path(path: &Path, id: &str, minimized: bool, clock: Clock) -> Result<Task, AppError> {
    mutate(path, clock, |record| {
        let task = record.task_mut(id)?;
        task.minimized = minimized;
        Ok(task.clone())
    })
}

fn delete_task_with_path(path: &Path, id: &str, clock: Clock) -> Result<Task, AppError> {
    mutate(path, clock, |record| {
        let removed_id = record.task(id)?.id.clone();
        let index = record
            .tasks
            .iter()
            .position(|task| task.id == removed_id)
            .ok_or_else(|| AppError::invalid_input("task not found"))?;
        let removed = record.tasks.remove(index);
        info!(task_id = %removed.id, "task deleted");
        Ok(removed)
    })
}

/// Keeps completed subtasks and replaces the open ones with a fresh AI
/// breakdown.
fn generate_subtasks_with_path(
    path: &Path,
    id: &str,
    assistant: &Assistant<'_>,
    clock: Clock,
) -> Result<AiApplied<Vec<Subtask>>, AppError> {
    let snapshot = load(path, clock)?.task(id)?.clone();
    if snapshot.completed {
        return Err(AppError::invalid_input("task already completed"));
    }

    let generated = assistant.generate_subtasks(&snapshot.prompt_text(), clock.now)?;
    if generated.is_fallback() {
        warn!(task_id = %snapshot.id, "using default subtasks");
    }

    let mut record = load(path, clock)?;
    if let Some(reason) = stale_reason(&record, &snapshot.id) {
        warn!(task_id = %snapshot.id, reason = %reason, "dropping generated subtasks");
        return Ok(AiApplied::Dropped { reason });
    }

    let task = record.task_mut(&snapshot.id)?;
    task.subtasks.retain(|subtask| subtask.completed);
    for subtask in generated.into_inner() {
        ledger::add_subtask(task, &subtask.text, clock.now)?;
    }
    if matches!(task.progress_source, ProgressSource::Subtasks | ProgressSource::Unset) {
        task.progress = ledger::completion_ratio(task);
        task.progress_source = ProgressSource::Subtasks;
    }
    let subtasks = task.subtasks.clone();

    json_store::save_record(path, &record)?;
    Ok(AiApplied::Applied(subtasks))
}

fn refresh_ratio_progress(task: &mut Task) {
    if task.progress_source == ProgressSource::Subtasks {
        task.progress = ledger::completion_ratio(task);
    }
}

fn add_subtask_with_path(path: &Path, id: &str, text: &str, clock: Clock) -> Result<Subtask, AppError> {
    mutate(path, clock, |record| {
        let task = record.task_mut(id)?;
        let subtask = ledger::add_subtask(task, text, clock.now)?;
        refresh_ratio_progress(task);
        Ok(subtask)
    })
}

fn edit_subtask_with_path(
    path: &Path,
    id: &str,
    subtask_id: &str,
    text: &str,
    clock: Clock,
) -> Result<TextEdit, AppError> {
    mutate(path, clock, |record| {
        let (task, pet) = record.task_and_pet(id)?;
        let edit = ledger::update_subtask_text(task, subtask_id, text)?;
        if matches!(edit, TextEdit::Removed(_)) {
            refresh_ratio_progress(task);
            complete_if_ledger_done(task, pet, clock)?;
        }
        Ok(edit)
    })
}

fn delete_subtask_with_path(
    path: &Path,
    id: &str,
    subtask_id: &str,
    clock: Clock,
) -> Result<SubtaskRemoval, AppError> {
    mutate(path, clock, |record| {
        let (task, pet) = record.task_and_pet(id)?;
        let removed = ledger::delete_subtask(task, subtask_id)?;
        refresh_ratio_progress(task);
        let completion = complete_if_ledger_done(task, pet, clock)?;
        Ok(SubtaskRemoval { removed, completion })
    })
}

/// Removing the last open subtask leaves every remaining one completed, which
/// completes the task.
fn complete_if_ledger_done(
    task: &mut Task,
    pet: &mut PetData,
    clock: Clock,
) -> Result<Option<CompletionReward>, AppError> {
    if ledger::all_completed(task) && !task.is_goal && !task.completed {
        return progress::complete(task, pet, clock.now).map(Some);
    }
    Ok(None)
}

fn toggle_subtask_with_path(
    path: &Path,
    id: &str,
    subtask_id: &str,
    clock: Clock,
) -> Result<ToggleOutcome, AppError> {
    mutate(path, clock, |record| {
        let (task, pet) = record.task_and_pet(id)?;
        progress::toggle_subtask(task, pet, subtask_id, clock.now)
    })
}

fn assess_progress_with_path(
    path: &Path,
    id: &str,
    note: &str,
    checked: &[(String, bool)],
    assistant: &Assistant<'_>,
    clock: Clock,
) -> Result<AiApplied<AssessmentOutcome>, AppError> {
    let mut snapshot = load(path, clock)?.task(id)?.clone();
    if snapshot.completed {
        return Err(AppError::invalid_input("task already completed"));
    }
    if snapshot.is_goal {
        return Err(AppError::invalid_input("goals are completed with proof or skip"));
    }
    progress::apply_checked(&mut snapshot, checked)?;

    let assessment = match assistant.assess_progress(&snapshot, note, clock.now) {
        Ok(assessment) => Some(assessment),
        Err(err) if err.is_recoverable() => None,
        Err(err) => return Err(err),
    };

    let mut record = load(path, clock)?;
    if let Some(reason) = stale_reason(&record, &snapshot.id) {
        warn!(task_id = %snapshot.id, reason = %reason, "dropping progress assessment");
        return Ok(AiApplied::Dropped { reason });
    }

    let (task, pet) = record.task_and_pet(&snapshot.id)?;
    progress::apply_checked(task, checked)?;
    let outcome = progress::apply_assessment(task, pet, assessment, clock.now)?;
    json_store::save_record(path, &record)?;
    Ok(AiApplied::Applied(outcome))
}

fn mark_done_with_path(path: &Path, id: &str, clock: Clock) -> Result<CompletionReward, AppError> {
    mutate(path, clock, |record| {
        let (task, pet) = record.task_and_pet(id)?;
        progress::mark_all_done(task, pet, clock.now)
    })
}

fn start_timer_with_path(path: &Path, id: &str, clock: Clock) -> Result<TimerChange, AppError> {
    mutate(path, clock, |record| {
        let task = record.task_mut(id)?;
        let changed = timer::start_timer(task, clock.now);
        Ok(TimerChange {
            task: task.clone(),
            changed,
            committed_ms: None,
        })
    })
}

fn pause_timer_with_path(
    path: &Path,
    id: &str,
    checkpoint: &mut dyn PauseCheckpoint,
    clock: Clock,
) -> Result<TimerChange, AppError> {
    mutate(path, clock, |record| {
        let task = record.task_mut(id)?;
        let committed_ms = timer::pause_timer(task, clock.now, checkpoint);
        Ok(TimerChange {
            task: task.clone(),
            changed: committed_ms.is_some(),
            committed_ms,
        })
    })
}

fn ensure_goal_open_today(task: &Task, clock: Clock) -> Result<(), AppError> {
    if !task.is_goal {
        return Err(AppError::invalid_input("task is not a goal"));
    }
    if streak::completed_today(&task.history, clock.now, clock.offset) {
        return Err(AppError::invalid_input("goal already completed today"));
    }
    Ok(())
}

fn submit_goal_proof_with_path(
    path: &Path,
    id: &str,
    proof: &Proof,
    assistant: &Assistant<'_>,
    clock: Clock,
) -> Result<AiApplied<ProofOutcome>, AppError> {
    let snapshot = load(path, clock)?.task(id)?.clone();
    ensure_goal_open_today(&snapshot, clock)?;

    let checked = assistant.validate_proof(&snapshot, proof)?;
    let fallback = checked.is_fallback();
    let verdict = checked.into_inner();
    if !verdict.valid {
        info!(task_id = %snapshot.id, "goal proof rejected");
        return Ok(AiApplied::Applied(ProofOutcome {
            verdict,
            fallback,
            completion: None,
        }));
    }

    let mut record = load(path, clock)?;
    let still_open = record
        .task(&snapshot.id)
        .map(|task| ensure_goal_open_today(task, clock).is_ok());
    match still_open {
        Err(_) => {
            return Ok(AiApplied::Dropped {
                reason: "goal was deleted while the AI was working".to_string(),
            });
        }
        Ok(false) => {
            return Ok(AiApplied::Dropped {
                reason: "goal was already completed today".to_string(),
            });
        }
        Ok(true) => {}
    }

    let (task, pet) = record.task_and_pet(&snapshot.id)?;
    let completion = streak::complete_goal(task, pet, GoalProof::Validated, clock.now, clock.offset)?;
    json_store::save_record(path, &record)?;
    Ok(AiApplied::Applied(ProofOutcome {
        verdict,
        fallback,
        completion: Some(completion),
    }))
}

fn skip_goal_with_path(path: &Path, id: &str, clock: Clock) -> Result<GoalCompletion, AppError> {
    mutate(path, clock, |record| {
        let (task, pet) = record.task_and_pet(id)?;
        streak::complete_goal(task, pet, GoalProof::Skipped, clock.now, clock.offset)
    })
}

fn goal_history_with_path(path: &Path, id: &str, clock: Clock) -> Result<GoalHistory, AppError> {
    let record = load(path, clock)?;
    let task = record.task(id)?;
    if !task.is_goal {
        return Err(AppError::invalid_input("task is not a goal"));
    }
    let mut entries = task.history.clone();
    entries.sort_by_key(|entry| std::cmp::Reverse(entry.date));
    Ok(GoalHistory {
        task_id: task.id.clone(),
        description: task.description.clone(),
        streak: task.streak,
        last_completed: task.last_completed,
        completed_today: streak::completed_today(&task.history, clock.now, clock.offset),
        entries,
    })
}

fn notify_reminders_with_path(
    path: &Path,
    notifier: &dyn Notifier,
    clock: Clock,
) -> Result<NotificationOutcome, AppError> {
    let record = load(path, clock)?;
    let mut reminders = Vec::new();
    let mut failures = Vec::new();

    for reminder in due_reminders(&record.tasks, clock.now, clock.offset) {
        let action = activation_argument(&reminder.task_id);
        match notifier.notify_with_action(&reminder, &action) {
            Ok(()) => reminders.push(reminder),
            Err(error) => failures.push(NotificationFailure {
                task_id: reminder.task_id.clone(),
                error,
            }),
        }
    }

    Ok(NotificationOutcome {
        reminders,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MediaInput, OfflineGenerator, ScriptedGenerator, TextGenerator};
    use crate::model::Timer;
    use crate::notify::ReminderKind;
    use crate::timer::NoCheckpoint;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    // 2025-12-20T12:00:00Z
    const NOW: i64 = 1_766_232_000_000;
    const DAY: i64 = 86_400_000;

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("petquest-{nanos}-{file_name}"))
    }

    fn clock() -> Clock {
        Clock::utc(NOW)
    }

    fn seed(path: &Path, tasks: Vec<Task>) {
        let mut record = UserRecord::new(NOW);
        record.tasks = tasks;
        json_store::save_record(path, &record).unwrap();
    }

    fn stored(path: &Path) -> UserRecord {
        json_store::read_record(path, NOW).unwrap()
    }

    fn subtask(id: &str, completed: bool) -> Subtask {
        Subtask {
            id: id.to_string(),
            text: format!("step {id}"),
            completed,
        }
    }

    fn task_with(id: &str, subtasks: Vec<Subtask>) -> Task {
        let mut task = Task::new(id.to_string(), "write report".to_string(), 30, NOW);
        task.subtasks = subtasks;
        task
    }

    fn goal(id: &str) -> Task {
        let mut task = Task::new(id.to_string(), "stretch".to_string(), 20, NOW);
        task.is_goal = true;
        task
    }

    fn request(description: &str) -> NewTask {
        NewTask {
            description: description.to_string(),
            with_subtasks: true,
            ..NewTask::default()
        }
    }

    #[test]
    fn add_task_rates_difficulty_and_generates_subtasks() {
        let path = temp_path("add.json");
        let generator = ScriptedGenerator::new([
            "I'd say about 73 out of 100",
            r#"Sure! [{"id": "a", "text": "Research"}, {"text": "Draft", "completed": true}]"#,
        ]);
        let assistant = Assistant::new(&generator);

        let outcome = add_task_with_path(&path, request("Write essay"), &assistant, clock()).unwrap();
        let record = stored(&path);
        fs::remove_file(&path).ok();

        let AddOutcome::Created { task, notices } = outcome else {
            panic!("expected created");
        };
        assert!(notices.is_empty());
        assert_eq!(task.difficulty, 73);
        assert_eq!(task.id, format!("task-{NOW}"));
        assert_eq!(task.subtasks.len(), 2);
        assert_eq!(task.subtasks[1].text, "Draft");
        assert_eq!(record.tasks, vec![task]);
    }

    #[test]
    fn add_task_rejects_blank_description_without_saving() {
        let path = temp_path("blank.json");
        let assistant = Assistant::new(&OfflineGenerator);

        let err = add_task_with_path(&path, request("   "), &assistant, clock()).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert!(!path.exists());
    }

    #[test]
    fn add_task_without_ai_needs_explicit_difficulty() {
        let path = temp_path("offline.json");
        let assistant = Assistant::new(&OfflineGenerator);

        let err = add_task_with_path(&path, request("Call dentist"), &assistant, clock()).unwrap_err();
        assert_eq!(err.code(), "unavailable");
        assert!(!path.exists());

        let mut explicit = request("Call dentist");
        explicit.difficulty = Some(12);
        let outcome = add_task_with_path(&path, explicit, &assistant, clock()).unwrap();
        fs::remove_file(&path).ok();

        let AddOutcome::Created { task, notices } = outcome else {
            panic!("expected created");
        };
        assert_eq!(task.difficulty, 12);
        assert_eq!(task.subtasks.len(), 2);
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn vague_task_asks_for_more_info() {
        let path = temp_path("vague.json");
        let generator = ScriptedGenerator::new([
            r#"{"needsMoreInfo": true, "message": "What stuff?"}"#,
        ]);
        let assistant = Assistant::new(&generator);
        let mut vague = request("do stuff");
        vague.check_completeness = true;

        let outcome = add_task_with_path(&path, vague, &assistant, clock()).unwrap();

        assert_eq!(
            outcome,
            AddOutcome::NeedsMoreInfo {
                message: "What stuff?".to_string()
            }
        );
        assert!(!path.exists());
    }

    #[test]
    fn goals_get_no_subtasks_and_reject_due_dates() {
        let path = temp_path("goal.json");
        let generator = ScriptedGenerator::new(["40"]);
        let assistant = Assistant::new(&generator);
        let mut new_goal = request("Meditate");
        new_goal.is_goal = true;

        add_task_with_path(&path, new_goal, &assistant, clock()).unwrap();
        let id = stored(&path).tasks[0].id.clone();
        let err = set_due_date_with_path(&path, &id, Some("2025-12-24"), clock()).unwrap_err();
        let record = stored(&path);
        fs::remove_file(&path).ok();

        assert_eq!(generator.prompts().len(), 1);
        assert!(record.tasks[0].subtasks.is_empty());
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn voice_transcript_becomes_task() {
        let path = temp_path("voice.json");
        let generator = ScriptedGenerator::new([
            r#"{"title": "Run daily", "description": "Go for a run.", "isGoal": true, "difficulty": 0, "dueDate": "null"}"#,
        ]);
        let assistant = Assistant::new(&generator);

        let outcome =
            add_task_from_transcript_with_path(&path, " I want to run every day ", &assistant, clock()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(outcome.transcript, "I want to run every day");
        assert!(!outcome.draft_fallback);
        let AddOutcome::Created { task, .. } = outcome.outcome else {
            panic!("expected created");
        };
        assert!(task.is_goal);
        assert_eq!(task.difficulty, 50);
        assert_eq!(task.details, "Go for a run.");
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn toggling_every_subtask_pays_once() {
        let path = temp_path("toggle.json");
        seed(&path, vec![task_with("t1", vec![subtask("a", true), subtask("b", false)])]);

        let outcome = toggle_subtask_with_path(&path, "t1", "b", clock()).unwrap();
        let again = toggle_subtask_with_path(&path, "t1", "b", clock());
        let done_again = mark_done_with_path(&path, "t1", clock());
        let record = stored(&path);
        fs::remove_file(&path).ok();

        assert_eq!(outcome.completion.map(|reward| reward.coins_earned), Some(60));
        assert!(again.is_err());
        assert!(done_again.is_err());
        assert_eq!(record.pet_data.coins, 60);
        assert_eq!(record.pet_data.total_tasks_completed, 1);
        assert!(record.tasks[0].completed);
    }

    #[test]
    fn deleting_last_open_subtask_completes_task() {
        let path = temp_path("delete-sub.json");
        seed(&path, vec![task_with("t1", vec![subtask("a", true), subtask("b", false)])]);

        let denied = delete_subtask_with_path(&path, "t1", "a", clock()).unwrap_err();
        let removal = delete_subtask_with_path(&path, "t1", "b", clock()).unwrap();
        let record = stored(&path);
        fs::remove_file(&path).ok();

        assert_eq!(denied.code(), "invalid_input");
        assert_eq!(removal.removed.id, "b");
        assert!(removal.completion.is_some());
        assert_eq!(record.tasks[0].progress, 100);
        assert_eq!(record.pet_data.coins, 60);
    }

    #[test]
    fn offline_assessment_falls_back_to_ratio() {
        let path = temp_path("assess-offline.json");
        let mut task = task_with("t1", vec![subtask("a", false), subtask("b", false)]);
        task.progress = 80;
        seed(&path, vec![task]);
        let assistant = Assistant::new(&OfflineGenerator);

        let outcome = assess_progress_with_path(
            &path,
            "t1",
            "did the first part",
            &[("a".to_string(), true)],
            &assistant,
            clock(),
        )
        .unwrap();
        let record = stored(&path);
        fs::remove_file(&path).ok();

        let AiApplied::Applied(outcome) = outcome else {
            panic!("expected applied");
        };
        assert!(outcome.fallback);
        assert!(outcome.notice.is_some());
        assert_eq!(record.tasks[0].progress, 50);
        assert!(record.tasks[0].subtasks[0].completed);
    }

    #[test]
    fn assessment_rejects_unknown_checked_subtask() {
        let path = temp_path("assess-unknown.json");
        seed(&path, vec![task_with("t1", vec![subtask("a", false)])]);
        let generator = ScriptedGenerator::default();
        let assistant = Assistant::new(&generator);

        let err = assess_progress_with_path(
            &path,
            "t1",
            "note",
            &[("zzz".to_string(), true)],
            &assistant,
            clock(),
        )
        .unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_input");
        assert!(generator.prompts().is_empty());
    }

    /// Deletes the task from the store while "thinking", like a second
    /// device would.
    struct DeletingGenerator {
        path: PathBuf,
        answer: &'static str,
        calls: RefCell<u32>,
    }

    impl TextGenerator for DeletingGenerator {
        fn model_name(&self) -> &str {
            "deleting"
        }

        fn generate(&self, _prompt: &str) -> Result<String, AppError> {
            *self.calls.borrow_mut() += 1;
            let mut record = stored(&self.path);
            record.tasks.clear();
            json_store::save_record(&self.path, &record).unwrap();
            Ok(self.answer.to_string())
        }

        fn generate_with_media(&self, prompt: &str, _media: &MediaInput) -> Result<String, AppError> {
            self.generate(prompt)
        }
    }

    #[test]
    fn assessment_for_deleted_task_is_dropped() {
        let path = temp_path("stale.json");
        seed(&path, vec![task_with("t1", vec![subtask("a", false)])]);
        let generator = DeletingGenerator {
            path: path.clone(),
            answer: r#"{"progress": 90, "explanation": "nearly"}"#,
            calls: RefCell::new(0),
        };
        let assistant = Assistant::new(&generator);

        let outcome = assess_progress_with_path(&path, "t1", "almost", &[], &assistant, clock()).unwrap();
        let record = stored(&path);
        fs::remove_file(&path).ok();

        assert!(matches!(outcome, AiApplied::Dropped { .. }));
        assert_eq!(*generator.calls.borrow(), 1);
        assert!(record.tasks.is_empty());
        assert_eq!(record.pet_data.coins, 0);
    }

    #[test]
    fn regenerating_subtasks_keeps_completed_ones() {
        let path = temp_path("regen.json");
        let mut task = task_with("t1", vec![subtask("a", true), subtask("b", false)]);
        task.progress = 50;
        task.progress_source = ProgressSource::Subtasks;
        seed(&path, vec![task]);
        let generator = ScriptedGenerator::new([r#"[{"text": "Edit"}, {"text": "Submit"}]"#]);
        let assistant = Assistant::new(&generator);

        let outcome = generate_subtasks_with_path(&path, "t1", &assistant, clock()).unwrap();
        fs::remove_file(&path).ok();

        let AiApplied::Applied(subtasks) = outcome else {
            panic!("expected applied");
        };
        let texts: Vec<_> = subtasks.iter().map(|subtask| subtask.text.as_str()).collect();
        assert_eq!(texts, vec!["step a", "Edit", "Submit"]);
        assert!(subtasks[1..].iter().all(|subtask| !subtask.completed));
    }

    #[test]
    fn timer_start_pause_accumulates() {
        let path = temp_path("timer.json");
        seed(&path, vec![task_with("t1", Vec::new())]);

        let started = start_timer_with_path(&path, "t1", Clock::utc(NOW)).unwrap();
        let restarted = start_timer_with_path(&path, "t1", Clock::utc(NOW + 500)).unwrap();
        let paused = pause_timer_with_path(&path, "t1", &mut NoCheckpoint, Clock::utc(NOW + 90_000)).unwrap();
        fs::remove_file(&path).ok();

        assert!(started.changed);
        assert!(!restarted.changed);
        assert_eq!(paused.committed_ms, Some(90_000));
        assert_eq!(
            paused.task.timer,
            Timer {
                is_running: false,
                start_time: None,
                elapsed_time: 90_000,
                last_paused_at: Some(NOW + 90_000),
            }
        );
    }

    #[test]
    fn skip_then_proof_same_day_is_rejected_before_ai_call() {
        let path = temp_path("goal-skip.json");
        seed(&path, vec![goal("g1")]);
        let generator = ScriptedGenerator::new([r#"{"valid": true}"#]);
        let assistant = Assistant::new(&generator);

        let completion = skip_goal_with_path(&path, "g1", clock()).unwrap();
        let err = submit_goal_proof_with_path(
            &path,
            "g1",
            &Proof::Text("photo".to_string()),
            &assistant,
            clock(),
        )
        .unwrap_err();
        let history = goal_history_with_path(&path, "g1", clock()).unwrap();
        let record = stored(&path);
        fs::remove_file(&path).ok();

        assert_eq!(completion.coins_earned, 40);
        assert!(completion.entry.skipped);
        assert_eq!(err.code(), "invalid_input");
        assert!(generator.prompts().is_empty());
        assert_eq!(history.streak, 1);
        assert!(history.completed_today);
        assert_eq!(record.pet_data.coins, 40);
        assert_eq!(record.pet_data.total_tasks_completed, 0);
    }

    #[test]
    fn valid_proof_extends_streak() {
        let path = temp_path("goal-proof.json");
        let mut yesterday = goal("g1");
        yesterday.history.push(HistoryEntry {
            date: NOW - DAY,
            validated: true,
            skipped: false,
        });
        seed(&path, vec![yesterday]);
        let generator = ScriptedGenerator::new([
            r#"{"valid": false, "message": "blurry"}"#,
            r#"{"valid": true, "message": "clear"}"#,
        ]);
        let assistant = Assistant::new(&generator);
        let proof = Proof::Media(MediaInput {
            mime_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8],
        });

        let rejected = submit_goal_proof_with_path(&path, "g1", &proof, &assistant, clock()).unwrap();
        let accepted = submit_goal_proof_with_path(&path, "g1", &proof, &assistant, clock()).unwrap();
        let record = stored(&path);
        fs::remove_file(&path).ok();

        let AiApplied::Applied(rejected) = rejected else {
            panic!("expected applied");
        };
        assert!(!rejected.verdict.valid);
        assert!(rejected.completion.is_none());
        let AiApplied::Applied(accepted) = accepted else {
            panic!("expected applied");
        };
        let completion = accepted.completion.unwrap();
        assert!(completion.entry.validated);
        assert_eq!(completion.streak, 2);
        assert_eq!(record.tasks[0].history.len(), 2);
    }

    struct RecordingNotifier {
        sent: RefCell<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, reminder: &Reminder) -> Result<(), AppError> {
            self.notify_with_action(reminder, "")
        }

        fn notify_with_action(&self, reminder: &Reminder, action: &str) -> Result<(), AppError> {
            if reminder.task_id == "broken" {
                return Err(AppError::io("bus unavailable"));
            }
            self.sent
                .borrow_mut()
                .push((reminder.task_id.clone(), action.to_string()));
            Ok(())
        }
    }

    #[test]
    fn notify_reports_sent_and_failed_reminders() {
        let path = temp_path("notify.json");
        let mut late = task_with("late", Vec::new());
        late.due_date = Some("2025-12-19".to_string());
        let mut broken = late.clone();
        broken.id = "broken".to_string();
        seed(&path, vec![late, broken, task_with("fine", Vec::new())]);
        let notifier = RecordingNotifier {
            sent: RefCell::new(Vec::new()),
        };

        let outcome = notify_reminders_with_path(&path, &notifier, clock()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(outcome.reminders.len(), 1);
        assert_eq!(outcome.reminders[0].kind, ReminderKind::Overdue);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].task_id, "broken");
        assert_eq!(
            notifier.sent.borrow().as_slice(),
            &[("late".to_string(), "show:late".to_string())]
        );
    }

    #[test]
    fn edits_validate_and_delete_removes() {
        let path = temp_path("edit.json");
        seed(&path, vec![task_with("t1", Vec::new())]);

        assert!(edit_task_with_path(&path, "t1", " ", clock()).is_err());
        let edited = edit_task_with_path(&path, "t1", "Write summary", clock()).unwrap();
        let detailed = set_details_with_path(&path, "t1", "  two pages ", clock()).unwrap();
        let bad_due = set_due_date_with_path(&path, "t1", Some("soon"), clock());
        let due = set_due_date_with_path(&path, "t1", Some("2025-12-24"), clock()).unwrap();
        let minimized = set_minimized_with_path(&path, "t1", true, clock()).unwrap();
        let removed = delete_task_with_path(&path, "t1", clock()).unwrap();
        let missing = get_task_by_id_with_path(&path, "t1", clock());
        fs::remove_file(&path).ok();

        assert_eq!(edited.description, "Write summary");
        assert_eq!(detailed.details, "two pages");
        assert!(bad_due.is_err());
        assert_eq!(due.due_date.as_deref(), Some("2025-12-24"));
        assert!(minimized.minimized);
        assert_eq!(removed.id, "t1");
        assert_eq!(missing.unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn list_filters_by_state() {
        let path = temp_path("list.json");
        let mut done = task_with("done", Vec::new());
        done.completed = true;
        done.progress = 100;
        seed(&path, vec![task_with("open", Vec::new()), done, goal("g1")]);

        let open = list_tasks_with_path(&path, ListFilter::Open, clock()).unwrap();
        let goals = list_tasks_with_path(&path, ListFilter::Goals, clock()).unwrap();
        let completed = list_tasks_with_path(&path, ListFilter::Completed, clock()).unwrap();
        let all = list_tasks_with_path(&path, ListFilter::All, clock()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(open.len(), 2);
        assert_eq!(goals[0].id, "g1");
        assert_eq!(completed[0].id, "done");
        assert_eq!(all.len(), 3);
    }
}
