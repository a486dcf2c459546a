use crate::errors::{ScheduleError, TaskError};
use crate::scheduler::Schedule;
use crate::task::chain::ContinuationChain;
use crate::task::continuation::{Continuation, FrameHandle, StepOutcome};
use crate::task::sink::SinkWriter;
use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// The resumable state machine of one task body.
pub(crate) type TaskBody<T> = Pin<Box<dyn Future<Output = Result<T, TaskError>> + Send>>;

/// [`TaskFrame`] is the heap resident state of one live task: its resumable body,
/// the result slot, the lifecycle latches, the scheduler binding inherited from
/// the caller, and the continuation chain wiring it into the task tree.
///
/// A frame is created suspended (the body exists but has never been stepped) and
/// is stepped by exactly one driver at a time. Destruction is reference counted:
/// the task handle, the scheduled unit of work, the awaiting caller and the chain
/// walker each hold a clone, and the frame drops exactly once when the last one
/// goes away. A blocking waiter keeping its clone alive is what the runtime
/// treats as an external reference.
pub(crate) struct TaskFrame<T> {
    label: String,
    body: Mutex<Option<TaskBody<T>>>,
    result: Mutex<Option<Result<T, TaskError>>>,
    result_stored: AtomicBool,
    /// Single shot race latch between this frame's completion path and the
    /// awaiting caller's suspension publish. Swapped at most twice, the second
    /// arrival continues execution.
    caller_resumed: AtomicBool,
    awaited: Mutex<Option<Continuation>>,
    scheduler: Mutex<Option<Arc<dyn Schedule>>>,
    sink: Mutex<Option<SinkWriter<T>>>,
    chain: ContinuationChain,
}

impl<T: Send + 'static> TaskFrame<T> {
    pub(crate) fn new(label: String) -> Self {
        Self {
            label,
            body: Mutex::new(None),
            result: Mutex::new(None),
            result_stored: AtomicBool::new(false),
            caller_resumed: AtomicBool::new(false),
            awaited: Mutex::new(None),
            scheduler: Mutex::new(None),
            sink: Mutex::new(None),
            chain: ContinuationChain::new(),
        }
    }

    /// Installs the body future right after construction. The body is created
    /// eagerly when the task is built but never stepped until scheduled.
    pub(crate) fn install_body(&self, body: TaskBody<T>) {
        let previous = self
            .body
            .lock()
            .expect("frame body lock poisoned")
            .replace(body);
        debug_assert!(previous.is_none(), "task body installed twice");
    }

    /// Installs the one-shot sink writer. Only top level frames carry one; the
    /// frames of awaited sub-tasks hand their result to the caller directly.
    pub(crate) fn install_sink(&self, writer: SinkWriter<T>) {
        *self.sink.lock().expect("frame sink lock poisoned") = Some(writer);
    }

    /// Binds the scheduler this frame dispatches through. Set once, by
    /// `run_async`/`sync_wait` for top level frames and inherited from the
    /// caller for awaited ones.
    pub(crate) fn bind_scheduler(&self, scheduler: Arc<dyn Schedule>) {
        *self
            .scheduler
            .lock()
            .expect("frame scheduler lock poisoned") = Some(scheduler);
    }

    /// Consumes the stored result. Callers reach this only through the latch
    /// protocol, after the store is guaranteed visible; between the store and
    /// this take the slot is stable.
    pub(crate) fn take_result(&self) -> Result<T, TaskError> {
        self.result
            .lock()
            .expect("frame result lock poisoned")
            .take()
            .expect("task result taken twice or before completion")
    }

    fn store_result(&self, result: Result<T, TaskError>) {
        debug_assert!(
            !self.result_stored.load(Ordering::Relaxed),
            "task result stored twice"
        );
        *self.result.lock().expect("frame result lock poisoned") = Some(result);
        self.result_stored.store(true, Ordering::Release);
    }
}

impl<T: Send + 'static> FrameHandle for TaskFrame<T> {
    fn resume_step(&self) -> StepOutcome {
        let mut body = self.body.lock().expect("frame body lock poisoned");
        let stepped = body
            .as_mut()
            .expect("stepping a task frame whose body already finished");
        // Suspension and resumption are driven directly through the continuation
        // chain, never through wakers, so the body is polled with a noop waker.
        let mut cx = Context::from_waker(Waker::noop());
        match catch_unwind(AssertUnwindSafe(|| stepped.as_mut().poll(&mut cx))) {
            Ok(Poll::Pending) => StepOutcome::Suspended,
            Ok(Poll::Ready(result)) => {
                // Tear the finished body down before publishing the result so
                // captured state dies ahead of the frame itself.
                *body = None;
                drop(body);
                self.store_result(result);
                StepOutcome::Completed
            }
            Err(payload) => {
                *body = None;
                drop(body);
                tracing::debug!(
                    target: "taskflow::frame",
                    frame = %self.label,
                    "task body panicked, capturing as error result"
                );
                self.store_result(Err(TaskError::Panicked(panic_message(payload))));
                StepOutcome::Completed
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.result_stored.load(Ordering::Acquire)
    }

    fn chain(&self) -> &ContinuationChain {
        &self.chain
    }

    fn claim_resume(&self) -> bool {
        self.caller_resumed.swap(true, Ordering::AcqRel)
    }

    fn resume_claimed(&self) -> bool {
        self.caller_resumed.load(Ordering::Acquire)
    }

    fn set_awaited(&self, child: Continuation) {
        let previous = self
            .awaited
            .lock()
            .expect("frame awaited lock poisoned")
            .replace(child);
        debug_assert!(
            previous.is_none(),
            "a frame can await at most one sub-task at a time"
        );
    }

    fn take_awaited(&self) -> Option<Continuation> {
        self.awaited
            .lock()
            .expect("frame awaited lock poisoned")
            .take()
    }

    fn scheduler(&self) -> Arc<dyn Schedule> {
        self.scheduler
            .lock()
            .expect("frame scheduler lock poisoned")
            .clone()
            .expect("task body ran before a scheduler was bound")
    }

    fn finalize(&self) {
        debug_assert!(self.is_complete(), "finalizing an incomplete frame");
        let writer = self.sink.lock().expect("frame sink lock poisoned").take();
        if let Some(writer) = writer {
            tracing::trace!(
                target: "taskflow::frame",
                frame = %self.label,
                "publishing result into the sink"
            );
            writer.publish(self.take_result());
        }
    }

    fn fail_unstarted(&self, error: ScheduleError) {
        debug_assert!(
            !self.is_complete(),
            "failing a frame that already completed"
        );
        // The body never ran; drop it so captured state is released here.
        *self.body.lock().expect("frame body lock poisoned") = None;
        self.store_result(Err(TaskError::Schedule(error)));
    }

    fn label(&self) -> &str {
        &self.label
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("opaque panic payload")
    }
}
