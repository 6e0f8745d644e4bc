// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use oiat_core::DateWindow;
use serde::{Deserialize, Serialize};

use super::Query;

/// Request from CLI or operator web portal to the daemon.
///
/// All mutation variants correspond to an Operator API endpoint gated by
/// a `PortalSettings` permission flag; the listener checks
/// the flag before acting, independent of what this enum allows callers
/// to construct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    Ping,

    Hello {
        version: String,
    },

    Query {
        query: Query,
    },

    /// Trigger a run for one tenant or all tenants over a date window.
    /// Requires `can_trigger_runs`.
    TriggerRun {
        tenant_scope: String,
        window: DateWindow,
        requested_by: String,
        #[serde(default)]
        skip_download: bool,
        #[serde(default)]
        dry_run: bool,
    },

    /// Flip a running job's cancel flag. Requires `can_trigger_runs`.
    CancelRun {
        id: String,
    },

    /// Requires `can_manage_schedules`.
    ScheduleCreate {
        cron_expression: String,
        timezone: String,
        tenant_scope: String,
        enabled: bool,
    },

    ScheduleUpdate {
        id: String,
        cron_expression: String,
        timezone: String,
        tenant_scope: String,
    },

    ScheduleToggle {
        id: String,
        enabled: bool,
    },

    ScheduleDelete {
        id: String,
    },

    /// Enqueue a job immediately from a schedule's configured scope,
    /// bypassing the next cron fire.
    ScheduleRunNow {
        id: String,
    },

    /// Requires `can_edit_companies`.
    CompanyCreate {
        config_json: String,
    },

    CompanyEdit {
        tenant_key: String,
        config_json: String,
    },

    /// Requires `can_manage_portal_settings`.
    PortalSettingsEdit {
        settings_json: String,
    },

    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
