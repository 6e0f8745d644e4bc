// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads per-tenant JSON configuration with environment-variable overrides.

use crate::env;
use crate::types::CompanyConfig;
use crate::ConfigError;
use std::path::Path;
use tracing::{debug, warn};

/// Load a single tenant's configuration file and apply environment overrides.
///
/// Overrides only ever replace an explicitly-named field; they never
/// invent new optional sub-records (inventory, tax mode) that weren't
/// present in the file, matching the loader's "config file is the source
/// of truth, environment is a tuning knob" contract.
pub fn load_company_config(path: &Path) -> Result<CompanyConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: CompanyConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(tz) = env::business_timezone_override() {
        debug!(tenant = %config.tenant_key, tz = %tz, "business timezone overridden by environment");
        config.business_timezone = tz;
    }
    validate_timezone(&config.business_timezone)?;

    if let Some((hour, minute)) = env::business_day_cutoff_override() {
        config.trading_day_cutoff = Some(crate::types::TradingDayCutoff { hour, minute });
    }

    if let Some(enabled) = env::inventory_enabled_override(config.tenant_key.as_str()) {
        if enabled != config.inventory.enabled {
            warn!(
                tenant = %config.tenant_key,
                file_value = config.inventory.enabled,
                env_value = enabled,
                "inventory enablement overridden by environment",
            );
        }
        config.inventory.enabled = enabled;
    }

    Ok(config)
}

/// Load every `*.json` file in a directory as a tenant config.
///
/// A single malformed file aborts the whole load (config errors are fatal
/// and surfaced to the operator, per the error-handling design), since a
/// partially-loaded fleet of tenants would silently skip scheduled runs.
pub fn load_all_company_configs(dir: &Path) -> Result<Vec<CompanyConfig>, ConfigError> {
    let mut configs = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    for path in paths {
        configs.push(load_company_config(&path)?);
    }
    Ok(configs)
}

fn validate_timezone(name: &str) -> Result<(), ConfigError> {
    name.parse::<chrono_tz::Tz>()
        .map(|_| ())
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
