// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::db::Db;
use chrono::NaiveDate;
use oiat_core::{DateWindow, RunJob, RunStatus, TenantScope};

fn queued_job() -> RunJob {
    RunJob {
        id: RunJobId::new(),
        tenant_scope: TenantScope::One("acme".into()),
        window: DateWindow::Single(NaiveDate::from_ymd_opt(2025, 12, 27).unwrap()),
        status: RunStatus::Queued,
        requested_by: "scheduler".to_string(),
        created_at_ms: 1,
        started_at_ms: None,
        finished_at_ms: None,
        pid: None,
        exit_code: None,
        failure_reason: None,
        log_path: "/tmp/run.log".into(),
        cancel_requested: false,
        phase_history: vec![],
        options: Default::default(),
    }
}

#[test]
fn current_lock_holder_reflects_the_running_job() {
    let db = Db::in_memory().expect("db");
    let job = queued_job();
    db.insert_run_job(&job).expect("insert");
    db.try_start_run_job(&job.id, 1_000).expect("start");

    let holder = db.current_lock_holder().expect("query").expect("present");
    assert_eq!(holder.job_id, job.id);
}

#[test]
fn force_release_clears_the_row_regardless_of_job_id() {
    let db = Db::in_memory().expect("db");
    let job = queued_job();
    db.insert_run_job(&job).expect("insert");
    db.try_start_run_job(&job.id, 1_000).expect("start");

    db.force_release_lock_row().expect("force release");
    assert!(db.current_lock_holder().expect("query").is_none());
}
