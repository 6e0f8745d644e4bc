// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oiat-config: configuration loading for the odd invoice automation tool.

mod error;
pub mod env;
pub mod loader;
pub mod settings;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_all_company_configs, load_company_config};
pub use settings::{load_portal_settings, PortalSettings};
pub use types::{
    CompanyConfig, CredentialKeys, GroupingStrategy, InventoryPolicy, InventorySyncMode,
    TaxComponent, TaxMode, TenantPaths, TradingDayCutoff,
};
