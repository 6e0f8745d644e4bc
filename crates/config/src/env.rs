// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the config crate.

use crate::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: `OIAT_STATE_DIR` > `XDG_STATE_HOME/oiat` > `~/.local/state/oiat`.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("OIAT_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("oiat"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/oiat"))
}

/// `OIAT_SCHEDULER_POLL_SECONDS`, default 15 per spec.
pub fn scheduler_poll_seconds() -> Duration {
    std::env::var("OIAT_SCHEDULER_POLL_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(15))
}

/// Fallback synthetic schedule used when no enabled `RunSchedule` exists.
pub fn env_fallback_cron() -> Option<(String, String)> {
    let cron = std::env::var("SCHEDULE_CRON").ok()?;
    let tz = std::env::var("SCHEDULE_TZ").unwrap_or_else(|_| "UTC".to_string());
    Some((cron, tz))
}

/// `OIAT_BUSINESS_TIMEZONE` override applied on top of a tenant's own config.
pub fn business_timezone_override() -> Option<String> {
    std::env::var("OIAT_BUSINESS_TIMEZONE").ok()
}

/// `OIAT_BUSINESS_DAY_CUTOFF_HOUR` / `OIAT_BUSINESS_DAY_CUTOFF_MINUTE` override.
pub fn business_day_cutoff_override() -> Option<(u32, u32)> {
    let hour = std::env::var("OIAT_BUSINESS_DAY_CUTOFF_HOUR")
        .ok()?
        .parse()
        .ok()?;
    let minute = std::env::var("OIAT_BUSINESS_DAY_CUTOFF_MINUTE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    Some((hour, minute))
}

/// Per-tenant override: `COMPANY_<KEY>_ENABLE_INVENTORY_ITEMS=1`.
pub fn inventory_enabled_override(tenant_key: &str) -> Option<bool> {
    let var = format!(
        "COMPANY_{}_ENABLE_INVENTORY_ITEMS",
        tenant_key.to_uppercase().replace('-', "_")
    );
    std::env::var(var).ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Resolve a named environment variable as a required credential.
pub fn resolve_credential(env_key: &str) -> Result<String, ConfigError> {
    std::env::var(env_key).map_err(|_| ConfigError::CredentialMissing(env_key.to_string()))
}

/// OAuth2 client credentials for the remote accounting service.
pub fn qbo_client_credentials() -> Result<(String, String), ConfigError> {
    let id = resolve_credential("QBO_CLIENT_ID")?;
    let secret = resolve_credential("QBO_CLIENT_SECRET")?;
    Ok((id, secret))
}

/// OAuth2 token endpoint for the connected app's refresh-token grant.
pub fn qbo_token_url() -> Result<String, ConfigError> {
    resolve_credential("QBO_TOKEN_URL")
}

/// Base URL of the accounting service's REST API, opaque beyond its
/// document/item query and create shapes.
pub fn remote_api_base_url() -> Result<String, ConfigError> {
    resolve_credential("QBO_API_BASE_URL")
}

/// Path to the external command that fetches a tenant's raw POS export,
/// standing in for the headless-browser collaborator.
pub fn download_command_path() -> Result<PathBuf, ConfigError> {
    resolve_credential("OIAT_DOWNLOAD_COMMAND").map(PathBuf::from)
}

/// Path to the external command that maps a raw export to the Upload
/// Engine's normalized row shape.
pub fn transform_command_path() -> Result<PathBuf, ConfigError> {
    resolve_credential("OIAT_TRANSFORM_COMMAND").map(PathBuf::from)
}

/// Operator-portal dashboard thresholds, e.g. `OIAT_DASHBOARD_STALE_RUN_MINUTES`.
pub fn dashboard_threshold(suffix: &str, default: u64) -> u64 {
    std::env::var(format!("OIAT_DASHBOARD_{suffix}"))
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
