mod common;

use common::{DiscardScheduler, DropProbe, FailingScheduler, drop_probe, schedulers};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use taskflow::scheduler::InlineScheduler;
use taskflow::task::Task;

#[test]
fn dropping_an_unscheduled_task_destroys_its_captured_state() {
    let (probe, drops) = drop_probe();

    let task: Task<i32> = Task::new(move |_ctx| async move {
        let _keep_alive = probe;
        Ok(2)
    });

    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(task);
    assert_eq!(
        drops.load(Ordering::SeqCst),
        1,
        "the never started body must be torn down with the handle"
    );
}

#[test]
fn completed_trees_tear_down_every_frame_exactly_once() {
    for (name, scheduler) in schedulers() {
        let (inner_probe, inner_drops) = drop_probe();
        let (outer_probe, outer_drops) = drop_probe();
        let (payload_probe, payload_drops) = drop_probe();

        let inner: Task<DropProbe> = Task::new(move |_ctx| async move {
            let _keep_alive = inner_probe;
            Ok(payload_probe)
        });
        let outer: Task<i32> = Task::new(move |ctx| async move {
            let _keep_alive = outer_probe;
            let payload = ctx.run(inner).await?;
            drop(payload);
            Ok(3)
        });

        let result = outer
            .sync_wait(scheduler)
            .unwrap_or_else(|error| panic!("scheduler `{name}`: {error}"));
        assert_eq!(result, 3, "scheduler `{name}`");
        assert_eq!(inner_drops.load(Ordering::SeqCst), 1, "scheduler `{name}`");
        assert_eq!(outer_drops.load(Ordering::SeqCst), 1, "scheduler `{name}`");
        assert_eq!(payload_drops.load(Ordering::SeqCst), 1, "scheduler `{name}`");
    }
}

#[test]
fn results_delivered_through_the_sink_drop_once_with_the_caller() {
    for (name, scheduler) in schedulers() {
        let (payload_probe, payload_drops) = drop_probe();

        let task: Task<DropProbe> = Task::new(move |_ctx| async move { Ok(payload_probe) });

        let delivered = task
            .sync_wait(scheduler)
            .unwrap_or_else(|error| panic!("scheduler `{name}`: {error}"));
        assert_eq!(
            payload_drops.load(Ordering::SeqCst),
            0,
            "scheduler `{name}`: the payload is alive while we hold it"
        );
        drop(delivered);
        assert_eq!(payload_drops.load(Ordering::SeqCst), 1, "scheduler `{name}`");
    }
}

#[test]
fn an_unawaited_subtask_destroys_its_never_started_frame() {
    for (name, scheduler) in schedulers() {
        let (probe, drops) = drop_probe();

        let outer = Task::new(move |ctx| async move {
            let never_run: Task<i32> = Task::new(move |_ctx| async move {
                let _keep_alive = probe;
                Ok(1)
            });
            let unawaited = ctx.run(never_run);
            drop(unawaited);
            Ok(5)
        });

        let result = outer
            .sync_wait(scheduler)
            .unwrap_or_else(|error| panic!("scheduler `{name}`: {error}"));
        assert_eq!(result, 5, "scheduler `{name}`");
        assert_eq!(
            drops.load(Ordering::SeqCst),
            1,
            "scheduler `{name}`: the unawaited sub-task never ran but must be torn down"
        );
    }
}

#[test]
fn rejected_schedules_leak_nothing() {
    let (probe, drops) = drop_probe();
    let scheduler = FailingScheduler::new(Arc::new(InlineScheduler), 1);

    let outer = Task::new(move |ctx| async move {
        let inner: Task<i32> = Task::new(move |_ctx| async move {
            let _keep_alive = probe;
            Ok(1)
        });
        let result = ctx.run(inner).await?;
        Ok(result + 1)
    });

    outer
        .sync_wait(scheduler)
        .expect_err("the nested schedule was rejected");
    assert_eq!(
        drops.load(Ordering::SeqCst),
        1,
        "the rejected child's captured state must be released exactly once"
    );
}

#[test]
fn discarded_units_leak_nothing() {
    let (probe, drops) = drop_probe();
    let scheduler = DiscardScheduler::new(Arc::new(InlineScheduler), 1);

    let outer = Task::new(move |ctx| async move {
        let inner: Task<i32> = Task::new(move |_ctx| async move {
            let _keep_alive = probe;
            Ok(1)
        });
        let result = ctx.run(inner).await?;
        Ok(result + 1)
    });

    outer
        .sync_wait(scheduler)
        .expect_err("the child's unit of work was discarded");
    assert_eq!(
        drops.load(Ordering::SeqCst),
        1,
        "the discarded child's captured state must be released exactly once"
    );
}

#[test]
fn error_paths_tear_down_the_whole_tree() {
    for (name, scheduler) in schedulers() {
        let (inner_probe, inner_drops) = drop_probe();
        let (outer_probe, outer_drops) = drop_probe();

        let inner: Task<i32> = Task::new(move |_ctx| async move {
            let _keep_alive = inner_probe;
            panic!("tear down test")
        });
        let outer: Task<i32> = Task::new(move |ctx| async move {
            let _keep_alive = outer_probe;
            let result = ctx.run(inner).await?;
            Ok(result + 1)
        });

        outer
            .sync_wait(scheduler)
            .expect_err("the inner body panicked");
        assert_eq!(inner_drops.load(Ordering::SeqCst), 1, "scheduler `{name}`");
        assert_eq!(outer_drops.load(Ordering::SeqCst), 1, "scheduler `{name}`");
    }
}
