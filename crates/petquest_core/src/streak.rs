//! Goal streak tracking. Streak and last-completed are always derived from the
//! append-only history log; the copies on `Task` are caches.

use crate::economy;
use crate::error::AppError;
use crate::model::{HistoryEntry, PetData, Task};
use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalProof {
    Validated,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalCompletion {
    pub coins_earned: u64,
    pub streak: u32,
    pub entry: HistoryEntry,
}

pub fn local_date(epoch_ms: i64, offset: UtcOffset) -> Option<Date> {
    let nanos = i128::from(epoch_ms) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .map(|moment| moment.to_offset(offset).date())
}

/// Consecutive local calendar days with at least one completion, ending today
/// (if completed today) or yesterday. Future-dated entries are ignored and
/// several entries on one day count once.
pub fn compute_streak(history: &[HistoryEntry], now: i64, offset: UtcOffset) -> u32 {
    let Some(today) = local_date(now, offset) else {
        return 0;
    };

    let mut days: Vec<Date> = history
        .iter()
        .filter_map(|entry| local_date(entry.date, offset))
        .filter(|day| *day <= today)
        .collect();
    days.sort_unstable_by(|a, b| b.cmp(a));

    let Some(most_recent) = days.first().copied() else {
        return 0;
    };
    if (today - most_recent).whole_days() > 1 {
        return 0;
    }

    let mut expected = most_recent;
    let mut streak = 0;
    for day in days {
        if day == expected {
            streak += 1;
            match expected.previous_day() {
                Some(previous) => expected = previous,
                None => break,
            }
        } else if day < expected {
            break;
        }
        // day > expected: a duplicate of a day already counted.
    }
    streak
}

pub fn last_completed(history: &[HistoryEntry]) -> Option<i64> {
    history.iter().map(|entry| entry.date).max()
}

pub fn completed_today(history: &[HistoryEntry], now: i64, offset: UtcOffset) -> bool {
    let today = local_date(now, offset);
    today.is_some()
        && history
            .iter()
            .any(|entry| local_date(entry.date, offset) == today)
}

/// Re-derives the cached streak fields of a goal from its history.
pub fn refresh_goal(task: &mut Task, now: i64, offset: UtcOffset) {
    if !task.is_goal {
        return;
    }
    task.streak = compute_streak(&task.history, now, offset);
    task.last_completed = last_completed(&task.history);
}

/// Appends a completion to the goal's history and pays the reward. One
/// completion per local day.
pub fn complete_goal(
    task: &mut Task,
    pet: &mut PetData,
    proof: GoalProof,
    now: i64,
    offset: UtcOffset,
) -> Result<GoalCompletion, AppError> {
    if !task.is_goal {
        return Err(AppError::invalid_input("task is not a goal"));
    }
    if completed_today(&task.history, now, offset) {
        return Err(AppError::invalid_input("goal already completed today"));
    }

    let entry = HistoryEntry {
        date: now,
        validated: proof == GoalProof::Validated,
        skipped: proof == GoalProof::Skipped,
    };
    task.history.push(entry);
    refresh_goal(task, now, offset);

    let coins_earned = task.coin_reward();
    economy::apply_reward(pet, coins_earned);
    info!(task_id = %task.id, streak = task.streak, coins = coins_earned, "goal completed");

    Ok(GoalCompletion {
        coins_earned,
        streak: task.streak,
        entry,
    })
}
