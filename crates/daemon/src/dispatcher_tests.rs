// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oiat_core::{FakeClock, RunOptions};
use tempfile::TempDir;

fn dispatcher(bin: &str, clock: FakeClock) -> (Dispatcher<FakeClock>, TempDir) {
    dispatcher_with_reap_threshold(bin, clock, std::time::Duration::from_secs(0))
}

fn dispatcher_with_reap_threshold(
    bin: &str,
    clock: FakeClock,
    reap_stale_after: std::time::Duration,
) -> (Dispatcher<FakeClock>, TempDir) {
    let tmp = TempDir::new().unwrap();
    let db = Db::in_memory().unwrap();
    let dispatcher = Dispatcher::with_reap_threshold(
        db,
        clock,
        PathBuf::from(bin),
        tmp.path().to_path_buf(),
        reap_stale_after,
    );
    (dispatcher, tmp)
}

#[tokio::test]
async fn dispatch_next_on_empty_queue_returns_empty() {
    let (dispatcher, _tmp) = dispatcher("/bin/true", FakeClock::new());
    let outcome = dispatcher.dispatch_next().await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Empty);
}

#[tokio::test]
async fn dispatch_next_starts_the_oldest_queued_job() {
    let (dispatcher, _tmp) = dispatcher("/bin/true", FakeClock::new());
    let id = dispatcher
        .enqueue(
            TenantScope::One("acme".into()),
            DateWindow::Single(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            "operator",
            RunOptions::default(),
        )
        .unwrap();

    let outcome = dispatcher.dispatch_next().await.unwrap();
    match outcome {
        DispatchOutcome::Started { job_id, pid } => {
            assert_eq!(job_id, id);
            assert!(pid > 0);
        }
        other => panic!("expected Started, got {other:?}"),
    }

    let job = dispatcher.db.get_run_job(&id).unwrap().unwrap();
    assert_eq!(job.status, RunStatus::Running);
    assert!(job.pid.is_some());
}

#[tokio::test]
async fn dispatch_next_reports_queued_when_lock_already_held() {
    let (dispatcher, _tmp) = dispatcher("/bin/true", FakeClock::new());
    let blocker = dispatcher
        .enqueue(
            TenantScope::All,
            DateWindow::Single(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            "operator",
            RunOptions::default(),
        )
        .unwrap();
    dispatcher.db.try_start_run_job(&blocker, 1).unwrap();

    let second = dispatcher
        .enqueue(
            TenantScope::One("acme".into()),
            DateWindow::Single(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            "operator",
            RunOptions::default(),
        )
        .unwrap();

    let outcome = dispatcher.dispatch_next().await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Queued { job_id: second });
}

#[tokio::test]
async fn dispatch_next_caps_consecutive_spawn_failures() {
    let (dispatcher, _tmp) = dispatcher("/no/such/orchestrator-binary-xyz", FakeClock::new());
    for i in 0..6 {
        dispatcher
            .enqueue(
                TenantScope::One("acme".into()),
                DateWindow::Single(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
                format!("operator-{i}"),
                RunOptions::default(),
            )
            .unwrap();
    }

    let outcome = dispatcher.dispatch_next().await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::StartFailed { .. }));

    let failed = dispatcher
        .db
        .list_run_jobs_by_status(RunStatus::Failed)
        .unwrap();
    assert_eq!(failed.len(), 5);

    let queued = dispatcher
        .db
        .list_run_jobs_by_status(RunStatus::Queued)
        .unwrap();
    assert_eq!(queued.len(), 1);
}

#[test]
fn reconcile_fails_running_jobs_with_a_dead_pid_past_the_stale_threshold() {
    let clock = FakeClock::new();
    let (dispatcher, _tmp) = dispatcher_with_reap_threshold(
        "/bin/true",
        clock.clone(),
        std::time::Duration::from_secs(4 * 60 * 60),
    );
    let id = dispatcher
        .enqueue(
            TenantScope::One("acme".into()),
            DateWindow::Single(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            "operator",
            RunOptions::default(),
        )
        .unwrap();
    dispatcher.db.try_start_run_job(&id, clock.epoch_ms()).unwrap();
    dispatcher.db.set_run_job_pid(&id, u32::MAX - 1).unwrap();

    clock.advance(std::time::Duration::from_secs(4 * 60 * 60 + 1));

    let reaped = dispatcher.reconcile().unwrap();
    assert_eq!(reaped, vec![id]);

    let job = dispatcher.db.get_run_job(&id).unwrap().unwrap();
    assert_eq!(job.status, RunStatus::Failed);
    assert_eq!(job.failure_reason.as_deref(), Some("reaped stale PID"));
    assert!(dispatcher.db.current_lock_holder().unwrap().is_none());
}

#[test]
fn reconcile_leaves_a_dead_pid_alone_within_the_grace_window() {
    let clock = FakeClock::new();
    let (dispatcher, _tmp) = dispatcher_with_reap_threshold(
        "/bin/true",
        clock.clone(),
        std::time::Duration::from_secs(4 * 60 * 60),
    );
    let id = dispatcher
        .enqueue(
            TenantScope::One("acme".into()),
            DateWindow::Single(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            "operator",
            RunOptions::default(),
        )
        .unwrap();
    dispatcher.db.try_start_run_job(&id, clock.epoch_ms()).unwrap();
    dispatcher.db.set_run_job_pid(&id, u32::MAX - 1).unwrap();

    clock.advance(std::time::Duration::from_secs(60));

    let reaped = dispatcher.reconcile().unwrap();
    assert!(reaped.is_empty());

    let job = dispatcher.db.get_run_job(&id).unwrap().unwrap();
    assert_eq!(job.status, RunStatus::Running);
}

#[test]
fn reconcile_leaves_running_jobs_with_a_live_pid_alone() {
    let (dispatcher, _tmp) = dispatcher("/bin/true", FakeClock::new());
    let id = dispatcher
        .enqueue(
            TenantScope::One("acme".into()),
            DateWindow::Single(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            "operator",
            RunOptions::default(),
        )
        .unwrap();
    dispatcher.db.try_start_run_job(&id, 1).unwrap();
    dispatcher.db.set_run_job_pid(&id, std::process::id()).unwrap();

    let reaped = dispatcher.reconcile().unwrap();
    assert!(reaped.is_empty());
    let job = dispatcher.db.get_run_job(&id).unwrap().unwrap();
    assert_eq!(job.status, RunStatus::Running);
}

#[test]
fn find_orchestrator_binary_falls_back_to_bare_name() {
    let path = find_orchestrator_binary("oiat-definitely-not-a-sibling-binary");
    assert_eq!(path, PathBuf::from("oiat-definitely-not-a-sibling-binary"));
}
