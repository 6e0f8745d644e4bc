// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strongly-typed per-tenant configuration.
//!
//! REDESIGN: replaces free-form config-dict access with a record that
//! rejects unknown fields (to surface config drift early) and fills in
//! defaults for every optional sub-record.

use oiat_core::TenantKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How normalized rows are grouped into a single uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    /// One document per (date, tender type).
    DateTender,
    /// One document per (date, location, tender type).
    DateLocationTender,
}

/// Sum type for the tenant's tax treatment, replacing free-form dict access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TaxMode {
    /// No tax handling; lines are uploaded without a tax component.
    None,
    /// A single flat rate applied to every line.
    Flat { rate_bp: u32 },
    /// Per-category components, e.g. state/local/city rates that sum.
    Components { components: Vec<TaxComponent> },
}

impl Default for TaxMode {
    fn default() -> Self {
        TaxMode::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxComponent {
    pub name: String,
    pub rate_bp: u32,
}

/// Optional trading-day cutoff: rows before this local time shift to the
/// previous calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingDayCutoff {
    pub hour: u32,
    pub minute: u32,
}

impl TradingDayCutoff {
    /// Boundary behavior: exactly-at-cutoff assigns to the *earlier* date
    /// (inclusive lower bound).
    pub fn shifts_to_prior_day(&self, local_hour: u32, local_minute: u32) -> bool {
        (local_hour, local_minute) <= (self.hour, self.minute)
    }
}

/// How a known inventory item is kept in sync with the remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySyncMode {
    /// Patch price/cost fields when they drift past the threshold.
    Inline,
    /// Never patch; just look the item up.
    UploadFast,
}

impl Default for InventorySyncMode {
    fn default() -> Self {
        InventorySyncMode::UploadFast
    }
}

/// Optional inventory handling policy, gated entirely behind `enabled`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryPolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sync_mode: InventorySyncMode,
    /// Path to a CSV mapping product category to asset/income/COGS account.
    #[serde(default)]
    pub category_account_map_path: Option<PathBuf>,
    /// When true, allow a document to post with only warnings on
    /// insufficient remote inventory quantity.
    #[serde(default)]
    pub allow_negative_inventory: bool,
    /// When true, lines whose inventory item has a future inventory-start
    /// date are swapped to a fallback service item.
    #[serde(default)]
    pub bypass_inventory_startdate: bool,
    /// Name of the fallback service item used by the bypass path.
    #[serde(default = "default_fallback_item")]
    pub fallback_service_item: String,
}

fn default_fallback_item() -> String {
    "Miscellaneous Sales".to_string()
}

/// Filesystem layout a tenant's pipeline run reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantPaths {
    pub staging_dir: PathBuf,
    pub spill_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub ledger_path: PathBuf,
}

/// Names of environment variables this tenant's credentials are read from,
/// resolved by [`crate::env::resolve_credential`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialKeys {
    pub epos_username_env: String,
    pub epos_password_env: String,
    #[serde(default)]
    pub slack_webhook_env: Option<String>,
}

/// The full per-tenant configuration record, loaded by the Configuration
/// Loader and never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyConfig {
    pub tenant_key: TenantKey,
    pub display_name: String,
    pub remote_realm_id: String,
    pub business_timezone: String,
    #[serde(default)]
    pub trading_day_cutoff: Option<TradingDayCutoff>,
    #[serde(default)]
    pub grouping_strategy: GroupingStrategy,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    pub receipt_prefix: String,
    pub paths: TenantPaths,
    pub credentials: CredentialKeys,
    #[serde(default)]
    pub tax_mode: TaxMode,
    #[serde(default)]
    pub inventory: InventoryPolicy,
    /// Reconciliation tolerance in currency units; default 1.0 per spec.
    #[serde(default = "default_reconcile_tolerance")]
    pub reconcile_tolerance: f64,
}

impl Default for GroupingStrategy {
    fn default() -> Self {
        GroupingStrategy::DateTender
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_reconcile_tolerance() -> f64 {
    1.0
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
