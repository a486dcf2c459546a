pub(crate) mod chain;
pub(crate) mod continuation;
pub(crate) mod frame;
pub(crate) mod sink;

#[allow(missing_docs)]
pub mod subtask;

pub use subtask::Subtask;

use crate::errors::{ScheduleError, TaskError};
use crate::scheduler::Schedule;
use crate::task::chain::WorkUnit;
use crate::task::continuation::{Continuation, FrameHandle};
use crate::task::frame::TaskFrame;
use crate::task::sink::sink_channel;
use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// [`Task`] is the outward facing, move-only owner of a not yet started
/// asynchronous computation. Calling a function that builds a [`Task`] creates
/// the underlying frame in its initial suspended state; nothing runs until the
/// handle is consumed by [`Task::run_async`] or [`Task::sync_wait`], or awaited
/// by a parent task through [`TaskContext::run`]
///
/// # Constructor(s)
/// There are 2 ways when it comes to creating a [`Task`]. The former is
/// [`Task::new`] which assigns a generated debug label, while the latter is
/// [`Task::labeled`] for when the task should be identifiable in traces and
/// debug output. Both take the task body as a closure receiving the
/// [`TaskContext`] and returning the body future
///
/// # Ownership Semantics
/// The handle owns its frame exclusively until consumed; dropping a handle that
/// was never handed to a scheduler destroys the frame together with the never
/// started body and everything it captured. Once consumed, ownership transfers
/// into the runtime and the frame destroys itself after its result is published
///
/// # Trait Implementation(s)
/// [`Task`] implements [`Debug`], displayed as a tuple struct containing the
/// debug label. It deliberately implements neither [`Clone`] nor [`Copy`]:
/// tasks are single shot and single consumer
///
/// # Example
/// ```ignore
/// use taskflow::scheduler::ThreadPoolScheduler;
/// use taskflow::task::Task;
///
/// let doubled = Task::new(|ctx| async move {
///     let base = ctx.run(load_base()).await?;
///     Ok(base * 2)
/// });
/// let result = doubled.sync_wait(ThreadPoolScheduler::shared())?;
/// ```
///
/// # See Also
/// - [`TaskContext`]
/// - [`Subtask`]
/// - [`crate::scheduler::Schedule`]
#[must_use = "a task does nothing until run or awaited"]
pub struct Task<T> {
    frame: Arc<TaskFrame<T>>,
}

impl<T: Send + 'static> Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Task").field(&self.frame.label()).finish()
    }
}

impl<T: Send + 'static> Task<T> {
    /// Creates a [`Task`] from its body with a generated debug label. The body
    /// closure runs immediately to build the body future, but the future itself
    /// stays suspended until the task is scheduled
    ///
    /// # Arguments
    /// - **body** A closure receiving this task's [`TaskContext`] and returning
    ///   the future that computes the task's result. Awaiting other tasks from
    ///   inside the body goes through [`TaskContext::run`] exclusively; foreign
    ///   futures that suspend have no way to wake a task frame
    ///
    /// # See Also
    /// - [`Task::labeled`]
    /// - [`TaskContext`]
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self::labeled(Uuid::new_v4().to_string(), body)
    }

    /// Creates a [`Task`] exactly like [`Task::new`] but with an explicit debug
    /// label, which pays off as soon as traces of more than one task need to be
    /// told apart
    pub fn labeled<F, Fut>(label: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let frame = Arc::new(TaskFrame::new(label.into()));
        let frame_dyn: Arc<dyn FrameHandle> = frame.clone();
        let handle: Weak<dyn FrameHandle> = Arc::downgrade(&frame_dyn);
        let context = TaskContext {
            frame: handle,
            label: frame.label().to_string(),
        };
        frame.install_body(Box::pin(body(context)));
        Self { frame }
    }

    /// Consumes the handle and schedules the task fire-and-forget style: the
    /// frame runs to completion on the given scheduler and destroys itself after
    /// publishing its result, which nobody reads
    ///
    /// # Arguments
    /// - **scheduler** Any [`Schedule`] implementation; shared schedulers are
    ///   usually passed as a clone of an ``Arc``
    ///
    /// # Returns
    /// ``Ok`` once the first unit of work is accepted. A synchronous rejection
    /// by the scheduler is returned directly since no other consumer exists
    ///
    /// # See Also
    /// - [`Task::sync_wait`]
    /// - [`Schedule`]
    pub fn run_async(self, scheduler: impl Schedule + 'static) -> Result<(), ScheduleError> {
        let scheduler: Arc<dyn Schedule> = Arc::new(scheduler);
        let (writer, reader) = sink_channel();
        // The sink exists but fire-and-forget has no consumer for it.
        drop(reader);
        self.frame.install_sink(writer);
        self.frame.bind_scheduler(scheduler.clone());
        tracing::trace!(
            target: "taskflow::task",
            task = self.frame.label(),
            "scheduling top level task (fire-and-forget)"
        );
        let unit = WorkUnit::new(Continuation::new(self.frame), None);
        scheduler.schedule(unit.into_unit_of_work())
    }

    /// Consumes the handle, schedules the task and blocks the calling thread
    /// until the task tree completes, returning the task's value or its error
    ///
    /// # Arguments
    /// - **scheduler** Any [`Schedule`] implementation. With the
    ///   [`crate::scheduler::InlineScheduler`] the whole tree runs on the
    ///   calling thread inside this call
    ///
    /// # Returns
    /// The value the task body returned, or the first error that reached the
    /// top of the tree: a body error, a captured panic, or a scheduling failure
    ///
    /// # Usage Note(s)
    /// This call parks the current thread. Calling it from inside a task body
    /// or from an async executor's worker thread invites deadlocks for the same
    /// reason any blocking call there does
    ///
    /// # See Also
    /// - [`Task::run_async`]
    /// - [`Schedule`]
    pub fn sync_wait(self, scheduler: impl Schedule + 'static) -> Result<T, TaskError> {
        let scheduler: Arc<dyn Schedule> = Arc::new(scheduler);
        let (writer, reader) = sink_channel();
        self.frame.install_sink(writer);
        self.frame.bind_scheduler(scheduler.clone());
        tracing::trace!(
            target: "taskflow::task",
            task = self.frame.label(),
            "scheduling top level task (blocking wait)"
        );
        let unit = WorkUnit::new(Continuation::new(self.frame.clone()), None);
        scheduler.schedule(unit.into_unit_of_work())?;
        reader.wait()
    }

    pub(crate) fn into_frame(self) -> Arc<TaskFrame<T>> {
        self.frame
    }
}

/// [`TaskContext`] is the capability handed to every task body, wrapping what
/// the body needs from its own frame: the inherited scheduler binding and the
/// ability to await other tasks
///
/// # Constructor(s)
/// There are no public constructors, a context is built by the runtime when the
/// task is created and passed into the body closure
///
/// # Trait Implementation(s)
/// The [`TaskContext`] implements [`Clone`] and [`Debug`], where [`Debug`]
/// outputs the owning task's debug label
///
/// # See Also
/// - [`Task`]
/// - [`Subtask`]
#[derive(Clone)]
pub struct TaskContext {
    frame: Weak<dyn FrameHandle>,
    label: String,
}

impl Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.label)
            .finish()
    }
}

impl TaskContext {
    /// Hands the given task to this task's scheduler and returns the awaitable
    /// carrying its eventual result. This is the one suspension primitive of
    /// the runtime: ``ctx.run(child).await`` yields the child's value or
    /// propagates its error
    ///
    /// # Arguments
    /// - **task** The sub-task to run. It inherits the scheduler of the task
    ///   this context belongs to
    ///
    /// # Returns
    /// The [`Subtask`] future; awaiting it drives the suspend/resume exchange
    /// described on [`Subtask`]
    ///
    /// # See Also
    /// - [`Subtask`]
    /// - [`Task`]
    pub fn run<U: Send + 'static>(&self, task: Task<U>) -> Subtask<U> {
        Subtask::new(task.into_frame(), self.frame.clone())
    }

    /// The debug label of the task this context belongs to
    pub fn debug_label(&self) -> &str {
        &self.label
    }
}
