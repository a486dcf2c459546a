use crate::errors::{ScheduleError, TaskError};
use crossbeam::channel::{Receiver, Sender, bounded};

/// Creates the one-shot result channel connecting a top level frame's final
/// trampoline to the caller that started it. Single producer, single consumer,
/// capacity one: publishing never blocks.
pub(crate) fn sink_channel<T: Send>() -> (SinkWriter<T>, SinkReader<T>) {
    let (tx, rx) = bounded(1);
    (SinkWriter { tx }, SinkReader { rx })
}

/// The producing end of the result sink, installed on a frame by `run_async` or
/// `sync_wait` and consumed exactly once at finalization.
pub(crate) struct SinkWriter<T> {
    tx: Sender<Result<T, TaskError>>,
}

impl<T: Send> SinkWriter<T> {
    /// Moves the frame's result into the sink. A fire-and-forget task has no
    /// reader anymore, in which case the result is simply discarded.
    pub(crate) fn publish(self, result: Result<T, TaskError>) {
        let _ = self.tx.send(result);
    }
}

/// The consuming end of the result sink, held by `sync_wait` while it blocks.
pub(crate) struct SinkReader<T> {
    rx: Receiver<Result<T, TaskError>>,
}

impl<T: Send> SinkReader<T> {
    /// Blocks until the result arrives. A disconnect without a published result
    /// means the frame's unit of work was torn down before it could run, which
    /// surfaces as a scheduling error.
    pub(crate) fn wait(self) -> Result<T, TaskError> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(TaskError::Schedule(ScheduleError::shutdown())))
    }
}
