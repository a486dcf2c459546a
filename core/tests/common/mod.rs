#![allow(dead_code)]

use crossbeam::channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use taskflow::errors::ScheduleError;
use taskflow::scheduler::{InlineScheduler, Schedule, ThreadPoolScheduler, UnitOfWork};

/// Upper bound for anything a test waits on. A healthy run stays far below it.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Every suite runs under both conformance schedulers: the inline one, where the
/// whole tree executes inside the scheduling call, and a small thread pool.
pub fn schedulers() -> Vec<(&'static str, Arc<dyn Schedule>)> {
    vec![
        ("inline", Arc::new(InlineScheduler) as Arc<dyn Schedule>),
        (
            "pool",
            Arc::new(ThreadPoolScheduler::builder().workers(4).build()) as Arc<dyn Schedule>,
        ),
    ]
}

pub fn counter() -> Arc<AtomicU32> {
    Arc::new(AtomicU32::new(0))
}

/// One-way notification from inside task bodies to the test thread, the token
/// side waits with a timeout. Triggering more than once is fine.
#[derive(Clone)]
pub struct Event {
    tx: Sender<()>,
}

pub struct EventToken {
    rx: Receiver<()>,
}

pub fn event() -> (Event, EventToken) {
    let (tx, rx) = unbounded();
    (Event { tx }, EventToken { rx })
}

impl Event {
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl EventToken {
    pub fn is_triggered(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }
}

/// Increments its counter exactly once, when dropped. Captured in task bodies
/// and result payloads to account for frame teardown.
pub struct DropProbe {
    hits: Arc<AtomicU32>,
}

pub fn drop_probe() -> (DropProbe, Arc<AtomicU32>) {
    let hits = counter();
    (DropProbe { hits: hits.clone() }, hits)
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Delegates to an inner scheduler but rejects the n-th schedule call (zero
/// based) with a synchronous error.
pub struct FailingScheduler {
    inner: Arc<dyn Schedule>,
    fail_at: u32,
    seen: AtomicU32,
}

impl FailingScheduler {
    pub fn new(inner: Arc<dyn Schedule>, fail_at: u32) -> Self {
        Self {
            inner,
            fail_at,
            seen: AtomicU32::new(0),
        }
    }
}

impl Schedule for FailingScheduler {
    fn schedule(&self, work: UnitOfWork) -> Result<(), ScheduleError> {
        if self.seen.fetch_add(1, Ordering::SeqCst) == self.fail_at {
            return Err(ScheduleError::new("injected schedule rejection"));
        }
        self.inner.schedule(work)
    }
}

/// Delegates to an inner scheduler but silently drops the n-th unit of work
/// after accepting it, imitating a queue torn down before draining.
pub struct DiscardScheduler {
    inner: Arc<dyn Schedule>,
    discard_at: u32,
    seen: AtomicU32,
}

impl DiscardScheduler {
    pub fn new(inner: Arc<dyn Schedule>, discard_at: u32) -> Self {
        Self {
            inner,
            discard_at,
            seen: AtomicU32::new(0),
        }
    }
}

impl Schedule for DiscardScheduler {
    fn schedule(&self, work: UnitOfWork) -> Result<(), ScheduleError> {
        if self.seen.fetch_add(1, Ordering::SeqCst) == self.discard_at {
            drop(work);
            return Ok(());
        }
        self.inner.schedule(work)
    }
}
