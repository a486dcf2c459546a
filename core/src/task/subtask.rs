use crate::errors::TaskError;
use crate::task::chain::WorkUnit;
use crate::task::continuation::{Continuation, FrameHandle};
use crate::task::frame::TaskFrame;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

#[allow(unused_imports)]
use crate::task::TaskContext;

enum SubtaskState {
    Unscheduled,
    Waiting,
    Finished,
}

/// [`Subtask`] is the awaitable handed out by [`TaskContext::run`]: the caller
/// side of a single suspend/resume exchange with an awaited sub-task
///
/// Awaiting it yields the sub-task's result, an error result propagates to the
/// awaiting body as the ``Err`` arm (rethrow is a ``?``). The first poll hands
/// the sub-task to the caller's scheduler and then resolves the race in one of
/// three ways:
/// - the sub-task already completed and relinquished the resumption, the result
///   is read inline and the caller never suspends
/// - the scheduler rejected the unit of work, the scheduling error becomes the
///   result immediately
/// - otherwise the caller records the sub-task for its driver and suspends, to
///   be stepped again by the sub-task's completion path
///
/// # Trait Implementation(s)
/// Only [`Future`]. The type is single shot: polling it after it produced its
/// result is a bug in the driver, not something user code can reach
#[must_use = "a sub-task does nothing until awaited"]
pub struct Subtask<T> {
    child: Arc<TaskFrame<T>>,
    parent: Weak<dyn FrameHandle>,
    state: SubtaskState,
}

impl<T: Send + 'static> Subtask<T> {
    pub(crate) fn new(child: Arc<TaskFrame<T>>, parent: Weak<dyn FrameHandle>) -> Self {
        Self {
            child,
            parent,
            state: SubtaskState::Unscheduled,
        }
    }
}

impl<T: Send + 'static> Future for Subtask<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.state {
            SubtaskState::Unscheduled => {
                let parent = this
                    .parent
                    .upgrade()
                    .expect("a sub-task can only be awaited inside its parent's body");
                // The sub-task inherits the caller's scheduler and is handed to
                // it before the caller commits to anything.
                let scheduler = parent.scheduler();
                this.child.bind_scheduler(scheduler.clone());
                let unit = WorkUnit::new(
                    Continuation::new(this.child.clone()),
                    Some(Continuation::new(parent.clone())),
                );
                tracing::trace!(
                    target: "taskflow::subtask",
                    parent = parent.label(),
                    child = this.child.label(),
                    "scheduling awaited sub-task"
                );
                if let Err(error) = scheduler.schedule(unit.into_unit_of_work()) {
                    this.state = SubtaskState::Finished;
                    return Poll::Ready(Err(TaskError::Schedule(error)));
                }
                if this.child.resume_claimed() {
                    // The sub-task ran to completion inside the schedule call
                    // (or beat us here) and relinquished the resumption.
                    this.state = SubtaskState::Finished;
                    return Poll::Ready(this.child.take_result());
                }
                parent.set_awaited(Continuation::new(this.child.clone()));
                this.state = SubtaskState::Waiting;
                Poll::Pending
            }
            SubtaskState::Waiting => {
                // Stepped again, which only the sub-task's completion path or a
                // fall-through after a lost race can cause: the result is in.
                debug_assert!(this.child.is_complete());
                this.state = SubtaskState::Finished;
                Poll::Ready(this.child.take_result())
            }
            SubtaskState::Finished => {
                panic!("a sub-task result can only be awaited once")
            }
        }
    }
}
