// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Schedule Worker: on each poll tick, reconciles the
//! Dispatcher, evaluates enabled cron schedules (or the env-cron
//! fallback), enqueues due jobs, then drains the dispatch queue.
//!
//! Loop shape — reconcile, then resume/advance — turns "resume
//! workers/crons from persisted state" into "evaluate schedules then
//! drain the dispatch queue" on a timer instead of once at startup.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use oiat_core::{Clock, DateWindow, RunJobId, RunOptions, TenantScope};
use oiat_storage::StorageError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatcher::{DispatchError, DispatchOutcome, Dispatcher};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("invalid cron expression {0:?}: {1}")]
    InvalidCron(String, String),
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
    #[error("timestamp out of range")]
    InvalidTimestamp,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub reaped: Vec<RunJobId>,
    pub enqueued: Vec<RunJobId>,
}

pub struct ScheduleWorker<C: Clock> {
    db: oiat_storage::Db,
    clock: C,
    poll_interval: Duration,
}

impl<C: Clock> ScheduleWorker<C> {
    pub fn new(db: oiat_storage::Db, clock: C, poll_interval: Duration) -> Self {
        Self {
            db,
            clock,
            poll_interval,
        }
    }

    /// Runs the poll loop until `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, dispatcher: Arc<Dispatcher<C>>, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("schedule worker shutting down");
                    return;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick(&dispatcher).await {
                        warn!(error = %e, "schedule worker tick failed");
                    }
                }
            }
        }
    }

    /// One evaluation pass: `Reconcile()`, evaluate schedules (or the
    /// env-cron fallback when none are enabled), then `DispatchNext()`
    /// until the queue is drained or the failure cap is hit.
    pub async fn tick(&self, dispatcher: &Dispatcher<C>) -> Result<TickSummary, SchedulerError> {
        let reaped = dispatcher.reconcile()?;
        let mut enqueued = Vec::new();

        let schedules = self.db.list_enabled_run_schedules()?;
        if schedules.is_empty() {
            if let Some((cron_expr, tz)) = oiat_config::env::env_fallback_cron() {
                if self.should_fire(&cron_expr, &tz, None)? {
                    let date = target_date(&tz, self.clock.epoch_ms())?;
                    let id = dispatcher.enqueue(
                        TenantScope::All,
                        DateWindow::Single(date),
                        "schedule:env-fallback",
                        RunOptions::default(),
                    )?;
                    enqueued.push(id);
                }
            }
        } else {
            for schedule in schedules {
                let now = self.clock.epoch_ms();
                if self.should_fire(&schedule.cron_expression, &schedule.timezone, schedule.last_evaluated_ms)? {
                    let date = target_date(&schedule.timezone, now)?;
                    let id = dispatcher.enqueue(
                        schedule.tenant_scope.clone(),
                        DateWindow::Single(date),
                        format!("schedule:{}", schedule.id),
                        RunOptions::default(),
                    )?;
                    enqueued.push(id);
                }
                self.db.mark_run_schedule_evaluated(&schedule.id, now, None)?;
            }
        }

        loop {
            match dispatcher.dispatch_next().await? {
                DispatchOutcome::Empty | DispatchOutcome::StartFailed { .. } => break,
                DispatchOutcome::Started { .. } | DispatchOutcome::Queued { .. } => continue,
            }
        }

        Ok(TickSummary { reaped, enqueued })
    }

    /// True if the schedule has a fire instant in `(anchor, now]`, where
    /// `anchor` is `last_evaluated` or (on first evaluation) one poll
    /// interval before now. Only the nearest upcoming fire is checked, so
    /// overlapping instants coalesce into at most one enqueue per tick.
    fn should_fire(
        &self,
        cron_expr: &str,
        tz_name: &str,
        last_evaluated_ms: Option<u64>,
    ) -> Result<bool, SchedulerError> {
        let tz: Tz = tz_name
            .parse()
            .map_err(|_| SchedulerError::UnknownTimezone(tz_name.to_string()))?;
        let schedule = parse_cron(cron_expr)?;

        let now_ms = self.clock.epoch_ms();
        let anchor_ms =
            last_evaluated_ms.unwrap_or_else(|| now_ms.saturating_sub(self.poll_interval.as_millis() as u64));

        let now_dt = to_tz(now_ms, tz)?;
        let anchor_dt = to_tz(anchor_ms, tz)?;

        Ok(schedule
            .after(&anchor_dt)
            .next()
            .is_some_and(|next_fire| next_fire <= now_dt))
    }
}

/// Parses a 5- or 6-field cron expression. The `cron` crate's grammar
/// requires a leading seconds field; a bare 5-field expression is
/// widened by assuming `0` seconds, keeping standard 5-field cron
/// semantics.
fn parse_cron(expr: &str) -> Result<CronSchedule, SchedulerError> {
    let widened;
    let normalized = if expr.split_whitespace().count() == 5 {
        widened = format!("0 {expr}");
        widened.as_str()
    } else {
        expr
    };
    CronSchedule::from_str(normalized).map_err(|e| SchedulerError::InvalidCron(expr.to_string(), e.to_string()))
}

fn to_tz(epoch_ms: u64, tz: Tz) -> Result<chrono::DateTime<Tz>, SchedulerError> {
    Utc.timestamp_millis_opt(epoch_ms as i64)
        .single()
        .map(|dt| dt.with_timezone(&tz))
        .ok_or(SchedulerError::InvalidTimestamp)
}

fn target_date(tz_name: &str, epoch_ms: u64) -> Result<NaiveDate, SchedulerError> {
    let tz: Tz = tz_name
        .parse()
        .map_err(|_| SchedulerError::UnknownTimezone(tz_name.to_string()))?;
    Ok(to_tz(epoch_ms, tz)?.date_naive())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
