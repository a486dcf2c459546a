//! Runs a two level task tree on a scheduler that spawns one detached thread
//! per unit of work, then blocks on the result.

use taskflow::errors::{ScheduleError, TaskError};
use taskflow::scheduler::{UnitOfWork, scheduler_fn};
use taskflow::task::Task;

fn foo() -> Task<i32> {
    Task::new(|_ctx| async move {
        println!("[foo] returning 3");
        Ok(3)
    })
}

fn main() -> Result<(), TaskError> {
    let thread_per_unit = scheduler_fn(|work: UnitOfWork| -> Result<(), ScheduleError> {
        std::thread::Builder::new()
            .spawn(work)
            .map_err(|error| ScheduleError::with_source("thread spawn failed", error))?;
        Ok(())
    });

    let my_task = Task::new(|ctx| async move {
        println!("[my_task] awaiting foo()");
        let foo_result = ctx.run(foo()).await?;
        println!("[my_task] returning 42; foo_result: {foo_result}");
        Ok(42)
    });

    let result = my_task.sync_wait(thread_per_unit)?;
    println!("[main] result: {result}");
    Ok(())
}
