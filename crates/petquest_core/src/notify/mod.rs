use crate::error::AppError;
use crate::model::Task;
use crate::streak;
use serde::Serialize;
use time::UtcOffset;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const APP_TITLE: &str = "PetQuest";
const DISABLE_ENV_VAR: &str = "PETQUEST_DISABLE_NOTIFICATIONS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Overdue,
    StreakAtRisk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub task_id: String,
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
}

pub trait Notifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError>;

    fn notify_with_action(&self, reminder: &Reminder, action: &str) -> Result<(), AppError> {
        let _ = action;
        self.notify(reminder)
    }
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _reminder: &Reminder) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(AppError::InvalidData(_)) => Ok(Box::new(NoopNotifier)),
        Err(other) => Err(other),
    }
}

/// Overdue open tasks and goals whose live streak has not been extended
/// today. Completed tasks never remind.
pub fn due_reminders(tasks: &[Task], now: i64, offset: UtcOffset) -> Vec<Reminder> {
    tasks
        .iter()
        .filter_map(|task| {
            if task.is_goal {
                let streak = streak::compute_streak(&task.history, now, offset);
                let at_risk = streak > 0 && !streak::completed_today(&task.history, now, offset);
                return at_risk.then(|| Reminder {
                    task_id: task.id.clone(),
                    kind: ReminderKind::StreakAtRisk,
                    title: format!("{APP_TITLE}: keep your streak"),
                    body: format!("{} ({} day streak)", task.description, streak),
                });
            }
            if task.completed {
                return None;
            }
            let overdue = task.due_at(offset).is_some_and(|due| due <= now);
            overdue.then(|| Reminder {
                task_id: task.id.clone(),
                kind: ReminderKind::Overdue,
                title: format!("{APP_TITLE}: overdue"),
                body: format!(
                    "{} (due {})",
                    task.description,
                    task.due_date.as_deref().unwrap_or_default()
                ),
            })
        })
        .collect()
}

const ACTION_PREFIX: &str = "show:";

pub fn activation_argument(task_id: &str) -> String {
    format!("{ACTION_PREFIX}{task_id}")
}

pub fn parse_activation_argument(argument: &str) -> Option<String> {
    argument
        .strip_prefix(ACTION_PREFIX)
        .map(|id| id.to_string())
}

pub fn launch_show(task_id: &str) -> Result<(), AppError> {
    let exe = std::env::current_exe().map_err(|err| AppError::io(err.to_string()))?;
    std::process::Command::new(exe)
        .arg("show")
        .arg(task_id)
        .spawn()
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
