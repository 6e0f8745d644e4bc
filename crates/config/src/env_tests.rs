// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn scheduler_poll_seconds_defaults_to_15() {
    std::env::remove_var("OIAT_SCHEDULER_POLL_SECONDS");
    assert_eq!(scheduler_poll_seconds(), Duration::from_secs(15));
}

#[test]
#[serial]
fn scheduler_poll_seconds_honors_override() {
    std::env::set_var("OIAT_SCHEDULER_POLL_SECONDS", "5");
    assert_eq!(scheduler_poll_seconds(), Duration::from_secs(5));
    std::env::remove_var("OIAT_SCHEDULER_POLL_SECONDS");
}

#[test]
#[serial]
fn inventory_override_uppercases_and_normalizes_key() {
    std::env::set_var("COMPANY_ACME_DOWNTOWN_ENABLE_INVENTORY_ITEMS", "1");
    assert_eq!(inventory_enabled_override("acme-downtown"), Some(true));
    std::env::remove_var("COMPANY_ACME_DOWNTOWN_ENABLE_INVENTORY_ITEMS");
}

#[test]
#[serial]
fn resolve_credential_errors_when_unset() {
    std::env::remove_var("TOTALLY_UNSET_CREDENTIAL_VAR");
    let err = resolve_credential("TOTALLY_UNSET_CREDENTIAL_VAR").unwrap_err();
    assert!(matches!(err, ConfigError::CredentialMissing(_)));
}
