use crate::errors::ScheduleError;
use crate::scheduler::{Schedule, UnitOfWork};
use crossbeam::channel::{Receiver, Sender, unbounded};
use once_cell::sync::Lazy;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;
use typed_builder::TypedBuilder;

/// The process wide shared pool, sized to the machine. Built lazily on first use so
/// merely linking the crate spawns no threads
static SHARED_POOL: Lazy<Arc<ThreadPoolScheduler>> =
    Lazy::new(|| Arc::new(ThreadPoolScheduler::builder().build()));

/// This is the builder config used for constructing a [`ThreadPoolScheduler`] instance.
/// By itself it should not be used, and it resides in [`ThreadPoolScheduler::builder`]
#[derive(TypedBuilder)]
#[builder(build_method(into = ThreadPoolScheduler))]
pub struct ThreadPoolConfig {
    /// The number of worker threads the pool spawns
    ///
    /// # Default Value
    /// The machine's available parallelism, falling back to one worker when it
    /// cannot be queried
    #[builder(default = default_workers())]
    workers: usize,

    /// The name given to every worker thread, mostly useful when reading traces
    /// or debugger output of a process hosting several pools
    ///
    /// # Default Value
    /// Every worker is named ``taskflow-worker``
    #[builder(default = String::from("taskflow-worker"), setter(into))]
    thread_name: String,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl From<ThreadPoolConfig> for ThreadPoolScheduler {
    fn from(config: ThreadPoolConfig) -> Self {
        let (queue_tx, queue_rx) = unbounded::<UnitOfWork>();
        let workers = (0..config.workers.max(1))
            .map(|index| spawn_worker(&config.thread_name, index, queue_rx.clone()))
            .collect();
        Self {
            queue: Some(queue_tx),
            workers,
        }
    }
}

fn spawn_worker(name: &str, index: usize, queue: Receiver<UnitOfWork>) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(format!("{name}-{index}"))
        .spawn(move || {
            tracing::debug!(target: "taskflow::scheduler", worker = index, "pool worker started");
            while let Ok(work) = queue.recv() {
                // Units of work built by the runtime never unwind, but raw user
                // closures scheduled directly might. A panicking unit must not
                // take the worker down with it.
                if catch_unwind(AssertUnwindSafe(work)).is_err() {
                    tracing::error!(
                        target: "taskflow::scheduler",
                        worker = index,
                        "unit of work panicked on pool worker"
                    );
                }
            }
            tracing::debug!(target: "taskflow::scheduler", worker = index, "pool worker stopped");
        })
        .expect("failed to spawn pool worker thread")
}

/// [`ThreadPoolScheduler`] dispatches units of work onto a fixed set of worker threads
/// fed from a single shared queue. It is the reference parallel [`Schedule`]
/// implementation of taskflow
///
/// # Constructor(s)
/// If one wishes to construct their own [`ThreadPoolScheduler`], they may do so via
/// [`ThreadPoolScheduler::builder`], alternatively for simple demos and tests it may be
/// preferred to use the lazily created process wide pool from
/// [`ThreadPoolScheduler::shared`]
///
/// # Shutdown Semantics
/// Dropping the pool disconnects the queue and joins every worker. Workers drain the
/// work that is already queued before exiting, and once the queue is disconnected any
/// further [`Schedule::schedule`] call fails with a [`ScheduleError`]. Units of work
/// that the runtime queued but that get discarded without running (for example when the
/// receiving side of the queue is torn down early) complete their task with a
/// scheduling error rather than vanishing
///
/// # Example
/// ```ignore
/// use taskflow::scheduler::ThreadPoolScheduler;
///
/// let pool = ThreadPoolScheduler::builder()
///     .workers(4)
///     .thread_name("renderer")
///     .build();
/// ```
pub struct ThreadPoolScheduler {
    queue: Option<Sender<UnitOfWork>>,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for ThreadPoolScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolScheduler")
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl ThreadPoolScheduler {
    /// Constructs a scheduler builder used for supplying the worker count and thread
    /// naming before building the pool itself
    ///
    /// # Returns
    /// The [`ThreadPoolConfigBuilder`] for constructing the [`ThreadPoolScheduler`]
    pub fn builder() -> ThreadPoolConfigBuilder {
        ThreadPoolConfig::builder()
    }

    /// The process wide shared pool, created on first call and sized to the machine's
    /// available parallelism. Prefer a dedicated pool when worker sizing matters
    pub fn shared() -> Arc<ThreadPoolScheduler> {
        SHARED_POOL.clone()
    }
}

impl Schedule for ThreadPoolScheduler {
    fn schedule(&self, work: UnitOfWork) -> Result<(), ScheduleError> {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(ScheduleError::shutdown)?;
        queue
            .send(work)
            .map_err(|_| ScheduleError::shutdown())
    }
}

impl Drop for ThreadPoolScheduler {
    fn drop(&mut self) {
        drop(self.queue.take());
        let current = std::thread::current().id();
        for worker in self.workers.drain(..) {
            if worker.thread().id() == current {
                // The last handle died inside a unit of work running on this
                // very worker. It cannot join itself; it finishes the current
                // unit and exits on its own once it sees the disconnect.
                continue;
            }
            if worker.join().is_err() {
                tracing::error!(target: "taskflow::scheduler", "pool worker terminated abnormally");
            }
        }
    }
}
