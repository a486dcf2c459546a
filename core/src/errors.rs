use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

#[allow(unused_imports)]
use crate::scheduler::Schedule;

#[allow(unused_imports)]
use crate::task::Task;

/// [`ScheduleError`] is reported synchronously by a [`Schedule`] implementation when it
/// cannot accept a unit of work. Once rejected, the unit of work is guaranteed to never
/// run, the runtime forwards the failure to whoever is waiting on the task that needed
/// the scheduling (either a suspended parent task or a blocked [`Task::sync_wait`] call)
///
/// # Constructor(s)
/// Schedulers build instances via [`ScheduleError::new`] for plain rejections,
/// [`ScheduleError::with_source`] when wrapping an underlying error and
/// [`ScheduleError::shutdown`] for the specific case where a queued unit of work was
/// discarded because its scheduler stopped before running it
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ScheduleError {
    message: String,
    #[source]
    source: Option<Arc<dyn Error + Send + Sync>>,
}

impl ScheduleError {
    /// Creates a [`ScheduleError`] carrying only a message describing the rejection
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a [`ScheduleError`] wrapping the underlying error that made the
    /// scheduler reject the unit of work
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// The error reported for a unit of work that was accepted but then discarded
    /// without ever running, which happens when a scheduler shuts down while work
    /// is still queued
    pub fn shutdown() -> Self {
        Self::new("scheduler shut down before the unit of work could run")
    }
}

/// [`TaskError`] is the error side of every task result in taskflow, it uses under the
/// hood [`thiserror`] to make it as smooth sailing to extend as possible. Whatever goes
/// wrong inside a task tree ends up as one of these variants, delivered to the awaiting
/// parent task or rethrown out of [`Task::sync_wait`], nothing is silently swallowed
///
/// # Cloning Semantics
/// The payloads are reference counted, so cloning is cheap and the same underlying
/// error can be observed both where it was caught and where it was rethrown
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    /// The task body returned an error of its own. The payload is opaque to the
    /// runtime and travels unchanged up the task tree
    #[error("task body failed: {0}")]
    Failed(#[source] Arc<dyn Error + Send + Sync>),

    /// A scheduler refused or dropped a unit of work, so the task (or one of the
    /// tasks it awaited) could not make progress
    #[error("task could not be scheduled: {0}")]
    Schedule(#[from] ScheduleError),

    /// The task body panicked. The panic is captured at the suspension boundary and
    /// converted into an error result instead of unwinding through the runtime
    #[error("task body panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Wraps an arbitrary error as a task failure, this is the constructor task
    /// bodies are expected to reach for when they fail with a domain error
    pub fn failure(error: impl Error + Send + Sync + 'static) -> Self {
        TaskError::Failed(Arc::new(error))
    }

    /// Attempts to view the original failure as a concrete error type, returning
    /// ``None`` for other variants or non-matching types
    pub fn failure_as<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            TaskError::Failed(source) => source.as_ref().downcast_ref::<E>(),
            _ => None,
        }
    }
}
