pub mod pet;
pub mod task;

pub use pet::PetData;
pub use task::{HistoryEntry, ProgressSource, Subtask, Task, TaskState, Timer};
