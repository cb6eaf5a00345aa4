pub mod ai;
pub mod clock;
pub mod coerce;
pub mod config;
pub mod economy;
pub mod error;
pub mod ledger;
pub mod model;
pub mod notify;
pub mod pet_api;
pub mod progress;
pub mod shop;
pub mod storage;
pub mod streak;
pub mod task_api;
pub mod timer;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{PetData, Task, TaskState};

    #[test]
    fn new_task_starts_untouched() {
        let task = Task::new("task-1".to_string(), "demo".to_string(), 40, 1_000);

        assert_eq!(task.id, "task-1");
        assert_eq!(task.description, "demo");
        assert_eq!(task.state(), TaskState::NotStarted);
        assert_eq!(task.progress, 0);
        assert!(task.subtasks.is_empty());
        assert!(!task.timer.is_running);
        assert!(!task.is_goal);
        assert_eq!(task.coin_reward(), 80);
    }

    #[test]
    fn new_pet_is_full_egg() {
        let pet = PetData::new(1_000);
        assert_eq!(pet.growth_stage, 0);
        assert_eq!(pet.coins, 0);
        assert_eq!(pet.average_stat(), 100.0);
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing description");
        assert_eq!(err.code(), "invalid_input");
        assert!(AppError::unavailable("offline").is_recoverable());
    }
}
