#[allow(missing_docs)]
pub mod thread_pool;

pub use thread_pool::ThreadPoolScheduler;

use crate::errors::ScheduleError;
use std::sync::Arc;

#[allow(unused_imports)]
use crate::task::Task;

/// A nullary callable owning its captures, handed to a [`Schedule`] implementation.
/// The runtime packs one resumption of a task tree into each unit of work
pub type UnitOfWork = Box<dyn FnOnce() + Send>;

/// [`Schedule`] is the single extension point between the task runtime and the outside
/// world, any value implementing it can play the scheduler role. The runtime never bakes
/// in a concrete executor, it only ever calls [`Schedule::schedule`]
///
/// # Contract
/// An implementation accepting a [`UnitOfWork`] must arrange for it to be invoked
/// **exactly once, eventually, on any thread of its choosing**. Running the unit of work
/// synchronously inside the ``schedule`` call itself is explicitly permitted (see
/// [`InlineScheduler`]), the runtime never assumes a thread boundary between the call
/// and the invocation. A failure to enqueue is reported synchronously through
/// [`ScheduleError`], in which case the unit of work must not run later
///
/// # Trait Implementation(s)
/// Out of the box the trait is implemented for:
/// - [`InlineScheduler`] which runs every unit of work on the calling thread
/// - [`ThreadPoolScheduler`] which dispatches onto a fixed pool of worker threads
/// - ``tokio::runtime::Handle`` which adapts an existing tokio runtime via its
///   blocking thread pool
/// - [`SchedulerFn`] which adapts any dispatching closure, so ad hoc adapters for
///   existing executors need nothing beyond [`scheduler_fn`]
/// - ``Arc<S>`` for any scheduler ``S``, making it relatively easy to hand the same
///   scheduler instance to many tasks
///
/// # See Also
/// - [`Task::run_async`]
/// - [`Task::sync_wait`]
/// - [`ScheduleError`]
pub trait Schedule: Send + Sync {
    /// Accepts a unit of work for execution. On ``Ok`` the work will run exactly once
    /// at some point, on ``Err`` it never runs and the error surfaces to whoever is
    /// waiting on the task that requested the dispatch
    fn schedule(&self, work: UnitOfWork) -> Result<(), ScheduleError>;
}

impl<S: Schedule + ?Sized> Schedule for Arc<S> {
    fn schedule(&self, work: UnitOfWork) -> Result<(), ScheduleError> {
        self.as_ref().schedule(work)
    }
}

/// [`SchedulerFn`] adapts a plain dispatching closure into a [`Schedule`]
/// implementation. This is the lightest way to put an existing executor under the
/// runtime: wrap whatever its spawn function looks like into a closure accepting a
/// [`UnitOfWork`]
///
/// # Constructor(s)
/// Built via [`scheduler_fn`]
///
/// # Example
/// ```ignore
/// use taskflow::scheduler::{scheduler_fn, UnitOfWork};
///
/// let spawner = scheduler_fn(|work: UnitOfWork| {
///     std::thread::spawn(work);
///     Ok(())
/// });
/// ```
pub struct SchedulerFn<F> {
    dispatch: F,
}

/// Wraps a dispatching closure into a [`SchedulerFn`] scheduler
pub fn scheduler_fn<F>(dispatch: F) -> SchedulerFn<F>
where
    F: Fn(UnitOfWork) -> Result<(), ScheduleError> + Send + Sync,
{
    SchedulerFn { dispatch }
}

impl<F> Schedule for SchedulerFn<F>
where
    F: Fn(UnitOfWork) -> Result<(), ScheduleError> + Send + Sync,
{
    fn schedule(&self, work: UnitOfWork) -> Result<(), ScheduleError> {
        (self.dispatch)(work)
    }
}

/// [`InlineScheduler`] runs every unit of work synchronously, on the thread that called
/// [`Schedule::schedule`], before the call returns. It is the degenerate single-threaded
/// scheduler and doubles as the conformance anchor for the runtime: everything that
/// works on a thread pool must also work inline
///
/// # Usage Note(s)
/// Because the work runs inside the ``schedule`` call, a whole task tree awaited through
/// this scheduler executes as plain nested function calls
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Schedule for InlineScheduler {
    fn schedule(&self, work: UnitOfWork) -> Result<(), ScheduleError> {
        work();
        Ok(())
    }
}

/// Adapts an existing tokio runtime as a task scheduler. Units of work are synchronous
/// callables, so they are dispatched onto the runtime's blocking thread pool where they
/// may park freely without starving the async workers
///
/// # Usage Note(s)
/// The handle's runtime must outlive the scheduled work, dispatching on a runtime that
/// is shutting down follows tokio's own ``spawn_blocking`` semantics
impl Schedule for tokio::runtime::Handle {
    fn schedule(&self, work: UnitOfWork) -> Result<(), ScheduleError> {
        tracing::trace!(target: "taskflow::scheduler", "dispatching unit of work onto tokio blocking pool");
        self.spawn_blocking(work);
        Ok(())
    }
}
