// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs exposed over the wire: flattened, serialization-stable views of
//! `oiat-core`'s record types. Kept distinct from the core types so that
//! internal fields (e.g. `phase_history`'s full `PhaseRecord`) can be
//! summarized differently for list vs. detail views without coupling the
//! protocol's stability to the core crate's internal representation.

use oiat_core::{DateWindow, ReconcileStatus, RunStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub id: String,
    pub tenant_scope: String,
    pub window: DateWindow,
    pub status: RunStatus,
    pub requested_by: String,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseRecordDetail {
    pub phase: String,
    pub started_at_ms: u64,
    pub finished_at_ms: Option<u64>,
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunDetail {
    pub summary: RunSummary,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub log_path: String,
    pub cancel_requested: bool,
    pub phase_history: Vec<PhaseRecordDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactSummary {
    pub id: String,
    pub run_job_id: String,
    pub tenant: String,
    pub target_date: chrono::NaiveDate,
    pub rows_in: u64,
    pub docs_uploaded: u64,
    pub docs_skipped_dup: u64,
    pub docs_failed: u64,
    pub source_total_cents: i64,
    pub remote_total_cents: i64,
    pub difference_cents: i64,
    pub reconcile_status: ReconcileStatus,
    pub processed_at_ms: u64,
    pub superseded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSummary {
    pub id: String,
    pub cron_expression: String,
    pub timezone: String,
    pub tenant_scope: String,
    pub enabled: bool,
    pub last_evaluated_ms: Option<u64>,
    pub next_fire_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanySummary {
    pub tenant_key: String,
    pub display_name: String,
    pub remote_realm_id: String,
    pub business_timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalSettingsDetail {
    pub can_trigger_runs: bool,
    pub can_manage_schedules: bool,
    pub can_edit_companies: bool,
    pub can_manage_portal_settings: bool,
    pub dashboard_stale_run_minutes: u64,
    pub notification_webhook_url: Option<String>,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
