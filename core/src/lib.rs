#[allow(missing_docs)]
pub mod errors;

#[allow(missing_docs)]
pub mod scheduler;

#[allow(missing_docs)]
pub mod task;

pub use crate::errors::{ScheduleError, TaskError};
pub use crate::scheduler::{
    InlineScheduler, Schedule, SchedulerFn, ThreadPoolScheduler, UnitOfWork, scheduler_fn,
};
pub use crate::task::{Subtask, Task, TaskContext};
