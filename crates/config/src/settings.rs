// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-wide portal settings, loaded from a single TOML file.
//!
//! Distinct from [`crate::types::CompanyConfig`]: this governs the
//! dashboard/daemon as a whole rather than any one tenant.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortalSettings {
    #[serde(default = "default_true")]
    pub can_trigger_runs: bool,
    #[serde(default = "default_true")]
    pub can_manage_schedules: bool,
    #[serde(default)]
    pub can_edit_companies: bool,
    #[serde(default)]
    pub can_manage_portal_settings: bool,
    /// Run considered "stale" in the dashboard after this many minutes
    /// without a phase transition. Informational only; the reaper's
    /// 4-hour stale-lock threshold is independent (see `oiat-daemon::lock`).
    #[serde(default = "default_stale_run_minutes")]
    pub dashboard_stale_run_minutes: u64,
    #[serde(default)]
    pub notification_webhook_url: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_stale_run_minutes() -> u64 {
    60
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            can_trigger_runs: true,
            can_manage_schedules: true,
            can_edit_companies: false,
            can_manage_portal_settings: false,
            dashboard_stale_run_minutes: default_stale_run_minutes(),
            notification_webhook_url: None,
        }
    }
}

pub fn load_portal_settings(path: &Path) -> Result<PortalSettings, ConfigError> {
    if !path.exists() {
        return Ok(PortalSettings::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
