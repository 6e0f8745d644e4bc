// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunJob`, `RunArtifact`, and `RunSchedule` record types.
//!
//! These are pure data definitions; `oiat-storage` owns reading and
//! writing them, `oiat-daemon` owns the state transitions.

use crate::ids::{RunArtifactId, RunJobId, RunScheduleId, TenantKey, TenantScope};
use crate::phase::PhaseRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Terminal and non-terminal states of a [`RunJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

crate::simple_display! {
    RunStatus {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// The date window a run processes: a single date or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    Single(NaiveDate),
    Range { from: NaiveDate, to: NaiveDate },
}

impl DateWindow {
    /// Every date in the window, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        match self {
            DateWindow::Single(d) => vec![*d],
            DateWindow::Range { from, to } => {
                let mut out = Vec::new();
                let mut cur = *from;
                while cur <= *to {
                    out.push(cur);
                    cur += chrono::Duration::days(1);
                }
                out
            }
        }
    }

    pub fn latest(&self) -> NaiveDate {
        match self {
            DateWindow::Single(d) => *d,
            DateWindow::Range { to, .. } => *to,
        }
    }

    pub fn earliest(&self) -> NaiveDate {
        match self {
            DateWindow::Single(d) => *d,
            DateWindow::Range { from, .. } => *from,
        }
    }
}

/// A request to run the pipeline for one or all tenants over a date window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunJob {
    pub id: RunJobId,
    pub tenant_scope: TenantScope,
    pub window: DateWindow,
    pub status: RunStatus,
    pub requested_by: String,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    /// Set while `status == Running`; used by the reaper's liveness probe.
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    /// ≤200 chars, see `PipelineError::failure_reason`.
    pub failure_reason: Option<String>,
    pub log_path: std::path::PathBuf,
    /// Flipped by a cancel request; the orchestrator observes it between
    /// phases and at safe points inside long loops.
    #[serde(default)]
    pub cancel_requested: bool,
    #[serde(default)]
    pub phase_history: Vec<PhaseRecord>,
    /// Options threaded from CLI flags / schedule config through to the
    /// orchestrator subprocess.
    #[serde(default)]
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub skip_download: bool,
    #[serde(default)]
    pub inventory_sync_mode: Option<InventorySyncMode>,
    #[serde(default)]
    pub bypass_inventory_startdate: bool,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySyncMode {
    Inline,
    UploadFast,
}

impl RunJob {
    crate::setters! {
        set { failure_reason: Option<String> }
        set { exit_code: Option<i32> }
        set { pid: Option<u32> }
    }
}

/// Reconciliation outcome for an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    Match,
    Mismatch,
    NotRun,
}

crate::simple_display! {
    ReconcileStatus {
        Match => "match",
        Mismatch => "mismatch",
        NotRun => "not_run",
    }
}

/// The immutable record produced by a successful (tenant, date) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    pub id: RunArtifactId,
    pub run_job_id: RunJobId,
    pub tenant: TenantKey,
    pub target_date: NaiveDate,
    pub rows_in: u64,
    pub docs_uploaded: u64,
    pub docs_skipped_dup: u64,
    pub docs_failed: u64,
    pub source_total_cents: i64,
    pub remote_total_cents: i64,
    pub difference_cents: i64,
    pub reconcile_status: ReconcileStatus,
    pub processed_at_ms: u64,
    /// Set when a later run for the same (tenant, date) produced a fresh
    /// artifact; the superseded artifact is retained for audit, not deleted.
    #[serde(default)]
    pub superseded: bool,
}

/// A persisted cron schedule, evaluated by the Schedule Worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSchedule {
    pub id: RunScheduleId,
    pub cron_expression: String,
    pub timezone: String,
    pub tenant_scope: TenantScope,
    pub enabled: bool,
    pub last_evaluated_ms: Option<u64>,
    pub next_fire_ms: Option<u64>,
}

#[cfg(test)]
#[path = "runjob_tests.rs"]
mod tests;
