use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time, UtcOffset};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 100;
pub const DEFAULT_DIFFICULTY: u8 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// Start/pause stopwatch attached to every task. Times are epoch milliseconds.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub is_running: bool,
    pub start_time: Option<i64>,
    pub elapsed_time: i64,
    pub last_paused_at: Option<i64>,
}

/// One goal completion. The log is append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: i64,
    pub validated: bool,
    pub skipped: bool,
}

/// Which signal last set `Task::progress`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    #[default]
    Unset,
    Subtasks,
    Assessment,
    Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub details: String,
    pub difficulty: u8,
    pub completed: bool,
    pub progress: u8,
    pub progress_source: ProgressSource,
    pub subtasks: Vec<Subtask>,
    pub timer: Timer,
    pub created_at: i64,
    pub due_date: Option<String>,
    pub minimized: bool,
    pub is_goal: bool,
    /// Cached; always recomputed from `history`.
    pub streak: u32,
    pub history: Vec<HistoryEntry>,
    /// Cached; always recomputed from `history`.
    pub last_completed: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    NotStarted,
    InProgress,
    Completed,
}

impl Task {
    pub fn new(id: String, description: String, difficulty: u8, created_at: i64) -> Self {
        Self {
            id,
            description,
            details: String::new(),
            difficulty: difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
            completed: false,
            progress: 0,
            progress_source: ProgressSource::Unset,
            subtasks: Vec::new(),
            timer: Timer::default(),
            created_at,
            due_date: None,
            minimized: false,
            is_goal: false,
            streak: 0,
            history: Vec::new(),
            last_completed: None,
        }
    }

    pub fn state(&self) -> TaskState {
        if self.completed {
            return TaskState::Completed;
        }
        let touched = self.subtasks.iter().any(|subtask| subtask.completed);
        if self.progress > 0 || touched {
            TaskState::InProgress
        } else {
            TaskState::NotStarted
        }
    }

    pub fn coin_reward(&self) -> u64 {
        u64::from(self.difficulty) * 2
    }

    /// Epoch ms at which the task becomes overdue, if it has a readable due
    /// date.
    pub fn due_at(&self, offset: UtcOffset) -> Option<i64> {
        self.due_date
            .as_deref()
            .and_then(|raw| parse_due_date(raw, offset))
    }

    /// Description plus the optional elaboration, as sent to the AI.
    pub fn prompt_text(&self) -> String {
        if self.details.trim().is_empty() {
            self.description.clone()
        } else {
            format!("{} {}", self.description, self.details.trim())
        }
    }
}

/// Accepts RFC3339 instants and plain `YYYY-MM-DD` dates. A plain date is due
/// at the end of that local day.
pub fn parse_due_date(raw: &str, offset: UtcOffset) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(moment) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(epoch_ms(moment));
    }
    let date = Date::parse(trimmed, format_description!("[year]-[month]-[day]")).ok()?;
    let next_midnight = date.next_day()?.with_time(Time::MIDNIGHT).assume_offset(offset);
    Some(epoch_ms(next_midnight))
}

fn epoch_ms(moment: OffsetDateTime) -> i64 {
    (moment.unix_timestamp_nanos() / 1_000_000) as i64
}
