use crate::errors::ScheduleError;
use crate::scheduler::UnitOfWork;
use crate::task::continuation::{Continuation, StepOutcome};
use crossbeam::utils::Backoff;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// [`ContinuationChain`] is the per frame structure threading suspended frames
/// together. Each frame owns exactly one chain and the chain never migrates.
///
/// Two things live here:
/// - the frame's own *suspension token*: a [`Continuation`] to the frame itself,
///   published while the frame is parked on an awaited child. Holding the token
///   is holding the exclusive right to step the frame.
/// - the *pending continuation*: the link to the frame whose suspension waits on
///   this frame's completion. The walk list of the whole tree is threaded
///   through frames via these links, which keeps it acyclic and finite.
///
/// The token slot is guarded by the stored latch: the publisher writes the slot
/// and then release-stores the latch, the taker acquire-waits on the latch and
/// then drains the slot. Writer and reader of a token never overlap.
pub(crate) struct ContinuationChain {
    suspended: Mutex<Option<Continuation>>,
    suspended_stored: AtomicBool,
    next: Mutex<Option<Continuation>>,
}

impl ContinuationChain {
    pub(crate) fn new() -> Self {
        Self {
            suspended: Mutex::new(None),
            suspended_stored: AtomicBool::new(false),
            next: Mutex::new(None),
        }
    }

    /// Links the frame that must be woken when this chain's frame completes.
    pub(crate) fn set_next(&self, continuation: Continuation) {
        let previous = self
            .next
            .lock()
            .expect("pending continuation lock poisoned")
            .replace(continuation);
        debug_assert!(
            previous.is_none(),
            "a frame can have at most one pending continuation"
        );
    }

    /// Takes the pending continuation link, if one was set.
    pub(crate) fn take_next(&self) -> Option<Continuation> {
        self.next
            .lock()
            .expect("pending continuation lock poisoned")
            .take()
    }

    /// Publishes the frame's suspension token. Must happen before the publisher
    /// attempts the caller-resumed latch of the awaited child, so that whoever
    /// loses that race can always observe the token.
    pub(crate) fn publish_token(&self, token: Continuation) {
        let previous = self
            .suspended
            .lock()
            .expect("suspension token lock poisoned")
            .replace(token);
        debug_assert!(previous.is_none(), "suspension token published twice");
        self.suspended_stored.store(true, Ordering::Release);
    }

    /// Takes back a token this side just published. Only the publisher may call
    /// this, and only after winning the race against the awaited child.
    pub(crate) fn retract_token(&self) -> Continuation {
        let token = self
            .suspended
            .lock()
            .expect("suspension token lock poisoned")
            .take()
            .expect("retracting a suspension token that was never published");
        self.suspended_stored.store(false, Ordering::Release);
        token
    }

    /// Claims the published token from the completing child's side. The caller
    /// has already lost the latch race, so the publish is either visible or at
    /// most a few instructions away; the backoff covers that window.
    pub(crate) fn take_token(&self) -> Continuation {
        let backoff = Backoff::new();
        while !self.suspended_stored.load(Ordering::Acquire) {
            backoff.snooze();
        }
        let token = self
            .suspended
            .lock()
            .expect("suspension token lock poisoned")
            .take()
            .expect("suspension token missing after its stored latch was set");
        self.suspended_stored.store(false, Ordering::Release);
        token
    }
}

/// Drives a frame, and on completion walks the pending continuations behind it,
/// until the tree either finishes or parks on a child that is still running.
///
/// This is the resumption engine of the runtime. Whoever calls it owns the
/// exclusive stepping rights for `start` (its unit of work, or the completion
/// path of a child that won the latch race).
///
/// Per step there are two outcomes:
/// - `Suspended`: the frame parked on a child. Its token is published, then the
///   child's caller-resumed latch is swapped. Arriving second (the child already
///   completed) means taking the token straight back and stepping again, the
///   fall-through path. Arriving first means the walk stops here: the child's
///   completion path arrives second and continues from the token.
/// - `Completed`: the frame is finalized, then its own caller-resumed latch is
///   swapped. Arriving first means the awaiting caller is not committed to a
///   suspension (it falls through reading the result inline) or nobody awaits
///   this frame at all; the walk stops. Arriving second means the caller is
///   parked: follow the pending link, claim the caller's token and keep walking.
///
/// A resumed frame that suspends again simply parks its token while its own
/// pending link stays intact, so the remainder of the walk is picked up when the
/// new child completes. Nothing is ever lost mid walk.
pub(crate) fn run_chain(start: Continuation) {
    let mut current = start;
    loop {
        match current.resume_step() {
            StepOutcome::Suspended => {
                let child = current.take_awaited().unwrap_or_else(|| {
                    panic!(
                        "task frame `{}` suspended on something that is not a sub-task; \
                         task bodies may only await futures handed out by TaskContext",
                        current.label()
                    )
                });
                current.chain().publish_token(current.clone());
                if child.claim_resume() {
                    // The child completed before we finished parking. Its walker
                    // saw a clear latch and relinquished, so the resumption stays
                    // with us: take the token back and step again.
                    tracing::trace!(
                        target: "taskflow::chain",
                        frame = current.label(),
                        child = child.label(),
                        "awaited child already complete, falling through"
                    );
                    let token = current.chain().retract_token();
                    current = token;
                    continue;
                }
                tracing::trace!(
                    target: "taskflow::chain",
                    frame = current.label(),
                    child = child.label(),
                    "suspension published, walk parked"
                );
                return;
            }
            StepOutcome::Completed => {
                current.finalize();
                if !current.claim_resume() {
                    // First arrival: either nobody awaits this frame, or the
                    // awaiting caller has not parked yet and will read the
                    // result inline once it loses the latch.
                    tracing::trace!(
                        target: "taskflow::chain",
                        frame = current.label(),
                        "completed with no parked caller, walk stopped"
                    );
                    return;
                }
                let parent = current
                    .chain()
                    .take_next()
                    .expect("a parked caller must be linked as the pending continuation");
                tracing::trace!(
                    target: "taskflow::chain",
                    frame = current.label(),
                    parent = parent.label(),
                    "completed, resuming parked caller"
                );
                current = parent.chain().take_token();
            }
        }
    }
}

/// One scheduled resumption of a task tree: runs the frame's chain from its
/// initial suspension, after linking the awaiting parent (if any) as the frame's
/// pending continuation.
///
/// The unit doubles as the dropped-work guard. A scheduler that accepted the
/// unit but tears it down without running it (queue dropped on shutdown) must
/// not leave the tree hanging: the frame completes with a scheduling error
/// through the regular completion path, releasing any parked parent or blocked
/// waiter.
pub(crate) struct WorkUnit {
    frame: Option<Continuation>,
    parent: Option<Continuation>,
}

impl WorkUnit {
    pub(crate) fn new(frame: Continuation, parent: Option<Continuation>) -> Self {
        Self {
            frame: Some(frame),
            parent,
        }
    }

    /// Boxes the unit into the scheduler-facing callable shape.
    pub(crate) fn into_unit_of_work(self) -> UnitOfWork {
        let mut unit = self;
        Box::new(move || unit.run())
    }

    fn run(&mut self) {
        let frame = self
            .frame
            .take()
            .expect("a unit of work runs at most once");
        if let Some(parent) = self.parent.take() {
            frame.chain().set_next(parent);
        }
        run_chain(frame);
    }
}

impl Drop for WorkUnit {
    fn drop(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        // Accepted but never ran. Complete the frame with a scheduling error and
        // run the same completion protocol a walker would.
        tracing::debug!(
            target: "taskflow::chain",
            frame = frame.label(),
            "unit of work discarded before running, failing the frame"
        );
        frame.fail_unstarted(ScheduleError::shutdown());
        frame.finalize();
        if frame.claim_resume() {
            let parent = self
                .parent
                .take()
                .expect("a parked caller implies this unit had a parent");
            run_chain(parent.chain().take_token());
        }
    }
}
