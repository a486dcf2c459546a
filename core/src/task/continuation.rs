use crate::errors::ScheduleError;
use crate::scheduler::Schedule;
use crate::task::chain::ContinuationChain;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// What a single resumption of a task frame produced: the body either ran to
/// completion (its result is stored) or parked itself on an awaited sub-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    Completed,
    Suspended,
}

/// The capability set a type erased frame reference must expose to the chain
/// machinery. The chain never owns a frame through this trait, it only borrows
/// behavior; lifetime is managed by the reference counted frame itself.
///
/// One method group steps and finishes the frame (`resume_step`, `finalize`,
/// `fail_unstarted`), one resolves the completes-versus-suspends race
/// (`claim_resume`, `resume_claimed`), and one wires frames together
/// (`chain`, `set_awaited`, `take_awaited`, `scheduler`).
pub(crate) trait FrameHandle: Send + Sync {
    /// Runs the frame's body until it suspends again or completes. Callers must
    /// hold exclusive stepping rights: two resumptions of one frame never overlap.
    fn resume_step(&self) -> StepOutcome;

    /// Whether the frame's result (value or error) has been stored.
    fn is_complete(&self) -> bool;

    /// The continuation chain owned by this frame.
    fn chain(&self) -> &ContinuationChain;

    /// Swaps the frame's caller-resumed latch, returning the previous value. The
    /// latch is swapped by exactly two parties over the frame's lifetime and the
    /// second arrival carries execution forward.
    fn claim_resume(&self) -> bool;

    /// Reads the caller-resumed latch without claiming it.
    fn resume_claimed(&self) -> bool;

    /// Records the child this frame just suspended on, for the driver to pick up.
    fn set_awaited(&self, child: Continuation);

    /// Takes the recorded awaited child, if any.
    fn take_awaited(&self) -> Option<Continuation>;

    /// The scheduler bound to this frame. Panics when the frame was never
    /// scheduled, which would be a runtime bug: bodies only run after binding.
    fn scheduler(&self) -> Arc<dyn Schedule>;

    /// The final trampoline: tears down what remains of the finished body and
    /// moves the result into the sink when a writer is installed.
    fn finalize(&self);

    /// Completes a frame whose unit of work was discarded before running, storing
    /// the scheduling error as its result.
    fn fail_unstarted(&self, error: ScheduleError);

    /// The frame's debug label.
    fn label(&self) -> &str;
}

/// A type erased, reference counted handle to a task frame. This is the currency
/// of the continuation chain: suspension tokens, pending continuation links and
/// awaited-child records are all [`Continuation`] values.
#[derive(Clone)]
pub(crate) struct Continuation {
    frame: Arc<dyn FrameHandle>,
}

impl Continuation {
    pub(crate) fn new(frame: Arc<dyn FrameHandle>) -> Self {
        Self { frame }
    }
}

impl Deref for Continuation {
    type Target = dyn FrameHandle;

    fn deref(&self) -> &Self::Target {
        self.frame.as_ref()
    }
}

impl Debug for Continuation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Continuation")
            .field(&self.frame.label())
            .finish()
    }
}
