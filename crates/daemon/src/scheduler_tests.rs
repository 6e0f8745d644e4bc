// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dispatcher::Dispatcher;
use chrono::TimeZone;
use oiat_core::{FakeClock, RunScheduleId, RunStatus};
use oiat_storage::Db;
use std::path::PathBuf;
use tempfile::TempDir;

fn epoch_ms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> u64 {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().timestamp_millis() as u64
}

fn worker(clock: FakeClock) -> ScheduleWorker<FakeClock> {
    ScheduleWorker::new(Db::in_memory().unwrap(), clock, Duration::from_secs(15))
}

#[test]
fn every_second_cron_fires_when_anchor_predates_now() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(epoch_ms(2025, 6, 1, 12, 0, 30));
    let w = worker(clock.clone());
    let fires = w
        .should_fire("* * * * * *", "UTC", Some(epoch_ms(2025, 6, 1, 12, 0, 15)))
        .unwrap();
    assert!(fires);
}

#[test]
fn daily_cron_does_not_fire_outside_its_window() {
    let now = epoch_ms(2025, 6, 1, 12, 0, 30);
    let clock = FakeClock::new();
    clock.set_epoch_ms(now);
    let w = worker(clock);
    let fires = w.should_fire("0 30 9 * * *", "UTC", Some(now - 15_000)).unwrap();
    assert!(!fires);
}

#[test]
fn five_field_cron_is_widened_with_zero_seconds() {
    assert!(parse_cron("*/5 * * * *").is_ok());
}

#[test]
fn unknown_timezone_is_rejected() {
    let clock = FakeClock::new();
    let w = worker(clock);
    let err = w.should_fire("* * * * * *", "Not/A/Zone", None).unwrap_err();
    assert!(matches!(err, SchedulerError::UnknownTimezone(_)));
}

#[tokio::test]
async fn tick_enqueues_a_due_schedule_and_drains_the_queue() {
    let db = Db::in_memory().unwrap();
    let clock = FakeClock::new();
    let now = epoch_ms(2025, 6, 1, 12, 0, 30);
    clock.set_epoch_ms(now);

    let schedule = oiat_core::RunSchedule {
        id: RunScheduleId::new(),
        cron_expression: "* * * * * *".to_string(),
        timezone: "UTC".to_string(),
        tenant_scope: TenantScope::All,
        enabled: true,
        last_evaluated_ms: Some(now - 15_000),
        next_fire_ms: None,
    };
    db.insert_run_schedule(&schedule).unwrap();

    let tmp = TempDir::new().unwrap();
    let worker = ScheduleWorker::new(db.clone(), clock.clone(), Duration::from_secs(15));
    let dispatcher = Dispatcher::new(db.clone(), clock, PathBuf::from("/bin/true"), tmp.path().to_path_buf());

    let summary = worker.tick(&dispatcher).await.unwrap();
    assert_eq!(summary.enqueued.len(), 1);

    let updated = db.get_run_schedule(&schedule.id).unwrap().unwrap();
    assert_eq!(updated.last_evaluated_ms, Some(now));

    let job = db.get_run_job(&summary.enqueued[0]).unwrap().unwrap();
    assert_ne!(job.status, RunStatus::Queued);
}

#[tokio::test]
async fn tick_with_no_enabled_schedules_and_no_env_fallback_enqueues_nothing() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(epoch_ms(2025, 6, 1, 12, 0, 30));
    let db = Db::in_memory().unwrap();
    let worker = ScheduleWorker::new(db.clone(), clock.clone(), Duration::from_secs(15));
    let tmp = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(db, clock, PathBuf::from("/bin/true"), tmp.path().to_path_buf());

    std::env::remove_var("SCHEDULE_CRON");
    let summary = worker.tick(&dispatcher).await.unwrap();
    assert!(summary.enqueued.is_empty());
}
