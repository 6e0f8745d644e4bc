// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::db::Db;
use chrono::NaiveDate;
use oiat_core::{DateWindow, RunJob, RunJobId, RunStatus, TenantScope};

fn sample_job() -> RunJob {
    RunJob {
        id: RunJobId::new(),
        tenant_scope: TenantScope::One("acme".into()),
        window: DateWindow::Single(NaiveDate::from_ymd_opt(2025, 12, 27).unwrap()),
        status: RunStatus::Queued,
        requested_by: "scheduler".to_string(),
        created_at_ms: 1_000,
        started_at_ms: None,
        finished_at_ms: None,
        pid: None,
        exit_code: None,
        failure_reason: None,
        log_path: "/var/log/oiat/run.log".into(),
        cancel_requested: false,
        phase_history: vec![],
        options: Default::default(),
    }
}

#[test]
fn insert_then_get_round_trips() {
    let db = Db::in_memory().expect("db");
    let job = sample_job();
    db.insert_run_job(&job).expect("insert");

    let loaded = db.get_run_job(&job.id).expect("get").expect("present");
    assert_eq!(loaded.id, job.id);
    assert_eq!(loaded.status, RunStatus::Queued);
    assert_eq!(loaded.window, job.window);
}

#[test]
fn oldest_queued_run_job_picks_earliest_created() {
    let db = Db::in_memory().expect("db");
    let mut older = sample_job();
    older.created_at_ms = 100;
    let mut newer = sample_job();
    newer.created_at_ms = 200;
    db.insert_run_job(&newer).expect("insert newer");
    db.insert_run_job(&older).expect("insert older");

    let picked = db.oldest_queued_run_job().expect("query").expect("present");
    assert_eq!(picked.id, older.id);
}

#[test]
fn try_start_run_job_fails_when_lock_already_held() {
    let db = Db::in_memory().expect("db");
    let a = sample_job();
    let b = sample_job();
    db.insert_run_job(&a).expect("insert a");
    db.insert_run_job(&b).expect("insert b");

    assert!(db.try_start_run_job(&a.id, 1_000).expect("start a"));
    assert!(!db.try_start_run_job(&b.id, 1_001).expect("start b blocked"));

    let a_loaded = db.get_run_job(&a.id).expect("get").expect("present");
    assert_eq!(a_loaded.status, RunStatus::Running);
    let b_loaded = db.get_run_job(&b.id).expect("get").expect("present");
    assert_eq!(b_loaded.status, RunStatus::Queued);
}

#[test]
fn finish_run_job_releases_the_lock_row() {
    let db = Db::in_memory().expect("db");
    let job = sample_job();
    db.insert_run_job(&job).expect("insert");
    db.try_start_run_job(&job.id, 1_000).expect("start");

    db.finish_run_job(&job.id, RunStatus::Succeeded, 2_000, Some(0), None)
        .expect("finish");

    let another = sample_job();
    db.insert_run_job(&another).expect("insert another");
    assert!(
        db.try_start_run_job(&another.id, 3_000).expect("start another"),
        "lock row should have been released by finish_run_job"
    );
}

#[test]
fn append_phase_record_accumulates_history() {
    use oiat_core::{Phase, PhaseOutcome, PhaseRecord};

    let db = Db::in_memory().expect("db");
    let job = sample_job();
    db.insert_run_job(&job).expect("insert");

    db.append_phase_record(
        &job.id,
        &PhaseRecord {
            phase: Phase::Download,
            started_at_ms: 1,
            finished_at_ms: 2,
            outcome: PhaseOutcome::Success,
            counts: Default::default(),
        },
    )
    .expect("append");

    let loaded = db.get_run_job(&job.id).expect("get").expect("present");
    assert_eq!(loaded.phase_history.len(), 1);
    assert_eq!(loaded.phase_history[0].phase, Phase::Download);
}
