use crate::model::{Task, Timer};

/// Receives a task right after its timer was paused. Pausing is the natural
/// point to ask the user how far along they are.
pub trait PauseCheckpoint {
    fn offer_progress_assessment(&mut self, task: &Task);
}

/// Checkpoint that ignores pauses.
pub struct NoCheckpoint;

impl PauseCheckpoint for NoCheckpoint {
    fn offer_progress_assessment(&mut self, _task: &Task) {}
}

impl Timer {
    /// Accumulated time plus the live run, if any. Never persisted mid-run.
    pub fn elapsed_at(&self, now: i64) -> i64 {
        match (self.is_running, self.start_time) {
            (true, Some(start)) => self.elapsed_time + (now - start).max(0),
            _ => self.elapsed_time,
        }
    }

    /// Returns false when the timer was already running.
    pub fn start(&mut self, now: i64) -> bool {
        if self.is_running {
            return false;
        }
        self.is_running = true;
        self.start_time = Some(now);
        true
    }

    /// Commits the live run into `elapsed_time`. Returns the committed delta,
    /// or `None` when the timer was not running.
    pub fn pause(&mut self, now: i64) -> Option<i64> {
        if !self.is_running {
            return None;
        }
        let delta = self.start_time.map(|start| (now - start).max(0)).unwrap_or(0);
        self.elapsed_time += delta;
        self.is_running = false;
        self.start_time = None;
        self.last_paused_at = Some(now);
        Some(delta)
    }
}

/// Starts the task's timer. No-op for completed tasks and running timers.
pub fn start_timer(task: &mut Task, now: i64) -> bool {
    if task.completed {
        return false;
    }
    task.timer.start(now)
}

/// Pauses the task's timer and hands the task to the checkpoint.
pub fn pause_timer(task: &mut Task, now: i64, checkpoint: &mut dyn PauseCheckpoint) -> Option<i64> {
    let committed = task.timer.pause(now)?;
    checkpoint.offer_progress_assessment(task);
    Some(committed)
}

pub fn format_duration(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
