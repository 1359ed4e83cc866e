//! Serialized poll scheduler tests.

mod common;

use cascade_core::BuildResult;
use cascade_core::build::Build;
use cascade_core::cause::Cause;
use cascade_core::ports::Project;
use cascade_trigger::changes::ScmChangeDetector;
use cascade_trigger::{PollTask, SchedulerConfig, SerializedPollScheduler};
use common::{FakeProject, handle};
use std::sync::Arc;
use std::time::Duration;

fn scheduler() -> Arc<SerializedPollScheduler> {
    Arc::new(SerializedPollScheduler::new(
        Arc::new(ScmChangeDetector::new()),
        SchedulerConfig::default(),
    ))
}

fn task(project: &Arc<FakeProject>, upstream_build: u32) -> PollTask {
    let build = Build::new("upstream", upstream_build, BuildResult::Success);
    PollTask::new(handle(project), Cause::upstream(&build), vec![])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_run_sequentially() {
    common::init_test_logging();
    let scheduler = scheduler();
    let project = FakeProject::new("shared-workspace")
        .exclusive()
        .with_pending_changes(true)
        .slow_poll(Duration::from_millis(5))
        .into_handle();

    const N: u32 = 16;
    let mut callers = Vec::new();
    for i in 0..N {
        let scheduler = Arc::clone(&scheduler);
        let project = Arc::clone(&project);
        callers.push(tokio::spawn(async move {
            scheduler.submit(task(&project, i)).unwrap();
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }

    scheduler.flush(project.id()).await;

    assert_eq!(project.poll_count(), N as usize);
    assert_eq!(project.max_concurrency(), 1);
    assert_eq!(project.scheduled().len(), N as usize);
    assert_eq!(scheduler.queue_count(), 1);
}

#[tokio::test]
async fn test_tasks_run_in_submission_order() {
    let scheduler = scheduler();
    let project = FakeProject::new("ordered")
        .exclusive()
        .with_pending_changes(true)
        .into_handle();

    for i in 1..=5 {
        scheduler.submit(task(&project, i)).unwrap();
    }
    scheduler.flush(project.id()).await;

    let order: Vec<u32> = project
        .scheduled()
        .iter()
        .map(|r| match &r.cause {
            Cause::Upstream(cause) => cause.upstream_build,
        })
        .collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_projects_get_independent_queues() {
    let scheduler = scheduler();
    let a = FakeProject::new("a").exclusive().into_handle();
    let b = FakeProject::new("b").exclusive().into_handle();

    scheduler.submit(task(&a, 1)).unwrap();
    scheduler.submit(task(&b, 1)).unwrap();
    scheduler.submit(task(&a, 2)).unwrap();

    scheduler.flush(a.id()).await;
    scheduler.flush(b.id()).await;

    assert_eq!(scheduler.queue_count(), 2);
    assert_eq!(a.poll_count(), 2);
    assert_eq!(b.poll_count(), 1);
}

#[tokio::test]
async fn test_deregister_drains_queued_tasks() {
    let scheduler = scheduler();
    let project = FakeProject::new("deleted")
        .exclusive()
        .with_pending_changes(true)
        .slow_poll(Duration::from_millis(10))
        .into_handle();

    scheduler.submit(task(&project, 1)).unwrap();
    scheduler.submit(task(&project, 2)).unwrap();
    assert!(scheduler.deregister(project.id()));
    assert!(!scheduler.is_registered(project.id()));
    assert!(!scheduler.deregister(project.id()));

    // Nothing left to flush against; wait for the detached worker instead.
    tokio::time::timeout(Duration::from_secs(5), async {
        while project.scheduled().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("queued tasks drained");
}

#[tokio::test]
async fn test_resubmission_after_deregister_creates_new_queue() {
    let scheduler = scheduler();
    let project = FakeProject::new("recreated").exclusive().into_handle();

    scheduler.submit(task(&project, 1)).unwrap();
    scheduler.flush(project.id()).await;
    scheduler.deregister(project.id());
    scheduler.submit(task(&project, 2)).unwrap();
    scheduler.flush(project.id()).await;

    assert!(scheduler.is_registered(project.id()));
    assert_eq!(project.poll_count(), 2);
}

#[tokio::test]
async fn test_failed_poll_drops_task_and_keeps_queue_alive() {
    let scheduler = scheduler();
    let broken = FakeProject::new("broken")
        .exclusive()
        .with_pending_changes(true)
        .failing_poll()
        .into_handle();

    scheduler.submit(task(&broken, 1)).unwrap();
    scheduler.submit(task(&broken, 2)).unwrap();
    scheduler.flush(broken.id()).await;

    assert_eq!(broken.poll_count(), 2);
    assert!(broken.scheduled().is_empty());
}

#[tokio::test]
async fn test_already_queued_is_not_an_error() {
    let scheduler = scheduler();
    let busy = FakeProject::new("busy")
        .exclusive()
        .with_pending_changes(true)
        .already_queued()
        .into_handle();

    scheduler.submit(task(&busy, 1)).unwrap();
    scheduler.submit(task(&busy, 2)).unwrap();
    scheduler.flush(busy.id()).await;

    assert_eq!(busy.scheduled().len(), 2);
}

#[tokio::test]
async fn test_quiet_period_override() {
    let scheduler = SerializedPollScheduler::new(
        Arc::new(ScmChangeDetector::new()),
        SchedulerConfig::default().with_quiet_period(Duration::ZERO),
    );
    let project = FakeProject::new("eager")
        .exclusive()
        .with_pending_changes(true)
        .into_handle();

    scheduler.submit(task(&project, 1)).unwrap();
    scheduler.flush(project.id()).await;

    assert_eq!(project.scheduled()[0].quiet_period, Duration::ZERO);
}

#[tokio::test]
async fn test_shutdown_waits_for_workers() {
    let scheduler = scheduler();
    let project = FakeProject::new("slow")
        .exclusive()
        .with_pending_changes(true)
        .slow_poll(Duration::from_millis(10))
        .into_handle();

    for i in 0..3 {
        scheduler.submit(task(&project, i)).unwrap();
    }
    scheduler.shutdown().await;

    assert_eq!(scheduler.queue_count(), 0);
    assert_eq!(project.scheduled().len(), 3);
}

#[tokio::test]
async fn test_flush_unknown_project_returns() {
    let scheduler = scheduler();
    scheduler.flush(&"never-used".into()).await;
    assert_eq!(scheduler.queue_count(), 0);
}

#[tokio::test]
async fn test_panicking_poll_keeps_queue_alive() {
    let scheduler = scheduler();
    let project = FakeProject::new("flaky")
        .exclusive()
        .with_pending_changes(true)
        .panicking_polls(1)
        .into_handle();

    scheduler.submit(task(&project, 1)).unwrap();
    scheduler.flush(project.id()).await;
    assert!(project.scheduled().is_empty());

    scheduler.submit(task(&project, 2)).unwrap();
    scheduler.flush(project.id()).await;

    assert_eq!(project.poll_count(), 2);
    let scheduled = project.scheduled();
    assert_eq!(scheduled.len(), 1);
    assert!(scheduled[0].cause.is_from(&"upstream".into(), 2));
    assert!(scheduler.is_registered(project.id()));
}

#[tokio::test]
async fn test_tasks_queued_behind_a_panic_still_run() {
    let scheduler = scheduler();
    let project = FakeProject::new("flaky")
        .exclusive()
        .with_pending_changes(true)
        .panicking_polls(1)
        .into_handle();

    for build in 1..=3 {
        scheduler.submit(task(&project, build)).unwrap();
    }
    scheduler.flush(project.id()).await;

    assert_eq!(project.poll_count(), 3);
    assert_eq!(project.scheduled().len(), 2);
}
