mod common;

use common::{TEST_TIMEOUT, counter, event};
use std::sync::atomic::Ordering;
use taskflow::errors::ScheduleError;
use taskflow::scheduler::{ThreadPoolScheduler, UnitOfWork, scheduler_fn};
use taskflow::task::Task;

fn two_level_sum() -> Task<i32> {
    Task::new(|ctx| async move {
        let inner: Task<i32> = Task::new(|_ctx| async move { Ok(2) });
        let result = ctx.run(inner).await?;
        Ok(result + 1)
    })
}

#[test]
fn a_closure_can_play_the_scheduler_role() {
    let dispatched = counter();

    let seen = dispatched.clone();
    let scheduler = scheduler_fn(move |work: UnitOfWork| -> Result<(), ScheduleError> {
        seen.fetch_add(1, Ordering::SeqCst);
        work();
        Ok(())
    });

    let result = two_level_sum().sync_wait(scheduler).expect("inline closure");
    assert_eq!(result, 3);
    assert_eq!(
        dispatched.load(Ordering::SeqCst),
        2,
        "one unit of work per task in the tree"
    );
}

#[test]
fn a_thread_spawning_closure_can_play_the_scheduler_role() {
    let scheduler = scheduler_fn(|work: UnitOfWork| -> Result<(), ScheduleError> {
        std::thread::Builder::new()
            .spawn(work)
            .map_err(|error| ScheduleError::with_source("spawn failed", error))?;
        Ok(())
    });

    let result = two_level_sum()
        .sync_wait(scheduler)
        .expect("thread-per-unit scheduler");
    assert_eq!(result, 3);
}

#[test]
fn a_tokio_runtime_can_play_the_scheduler_role() {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    let result = two_level_sum()
        .sync_wait(runtime.handle().clone())
        .expect("tokio blocking pool scheduler");
    assert_eq!(result, 3);
}

#[test]
fn pool_builder_accepts_sizing_and_naming() {
    let pool = ThreadPoolScheduler::builder()
        .workers(2)
        .thread_name("sched-test")
        .build();

    let result = two_level_sum().sync_wait(pool).expect("configured pool");
    assert_eq!(result, 3);
}

#[test]
fn the_shared_pool_is_usable_out_of_the_box() {
    let (called, token) = event();

    let task: Task<i32> = Task::new(move |_ctx| async move {
        called.trigger();
        Ok(9)
    });
    let result = task
        .sync_wait(ThreadPoolScheduler::shared())
        .expect("shared pool");

    assert_eq!(result, 9);
    assert!(token.is_triggered(TEST_TIMEOUT));
}

#[test]
fn a_single_worker_pool_runs_every_queued_unit() {
    let pool = std::sync::Arc::new(ThreadPoolScheduler::builder().workers(1).build());

    let calls = counter();
    let (done, token) = event();
    for _ in 0..8 {
        let seen = calls.clone();
        let finished = done.clone();
        let task: Task<()> = Task::new(move |_ctx| async move {
            seen.fetch_add(1, Ordering::SeqCst);
            finished.trigger();
            Ok(())
        });
        task.run_async(pool.clone()).expect("queueing on a live pool");
    }

    for queued in 0..8 {
        assert!(
            token.is_triggered(TEST_TIMEOUT),
            "task {queued} never completed"
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}
