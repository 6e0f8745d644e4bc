// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oiat_config::types::{CredentialKeys, TenantPaths, TradingDayCutoff};
use oiat_config::CompanyConfig;
use tempfile::TempDir;

fn test_config(tmp: &TempDir) -> CompanyConfig {
    CompanyConfig {
        tenant_key: "acme".into(),
        display_name: "Acme Downtown".to_string(),
        remote_realm_id: "12345".to_string(),
        business_timezone: "America/New_York".to_string(),
        trading_day_cutoff: None,
        grouping_strategy: oiat_config::GroupingStrategy::DateTender,
        date_format: "%Y-%m-%d".to_string(),
        receipt_prefix: "ACM".to_string(),
        paths: TenantPaths {
            staging_dir: tmp.path().join("staging"),
            spill_dir: tmp.path().join("spill"),
            archive_dir: tmp.path().join("archive"),
            ledger_path: tmp.path().join("ledger.json"),
        },
        credentials: CredentialKeys {
            epos_username_env: "EPOS_USERNAME_ACME".to_string(),
            epos_password_env: "EPOS_PASSWORD_ACME".to_string(),
            slack_webhook_env: None,
        },
        tax_mode: Default::default(),
        inventory: Default::default(),
        reconcile_tolerance: 1.0,
    }
}

fn row_at(ts: &str, field: &str) -> RawRow {
    RawRow {
        fields: vec![field.to_string()],
        timestamp: ts.parse().expect("valid rfc3339 timestamp"),
    }
}

fn header() -> Vec<String> {
    vec!["note".to_string()]
}

#[test]
fn assigns_date_in_business_timezone() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    // 2025-12-28T02:00:00Z is 2025-12-27T21:00:00-05:00 in New York.
    let date = assign_business_date("2025-12-28T02:00:00Z".parse().unwrap(), &config).unwrap();
    assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2025, 12, 27).unwrap());
}

#[test]
fn cutoff_exactly_at_minute_shifts_to_prior_day() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.trading_day_cutoff = Some(TradingDayCutoff { hour: 4, minute: 0 });
    // 2025-12-28T09:00:00Z == 2025-12-28T04:00:00-05:00, exactly at cutoff.
    let date = assign_business_date("2025-12-28T09:00:00Z".parse().unwrap(), &config).unwrap();
    assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2025, 12, 27).unwrap());
}

#[test]
fn cutoff_one_minute_after_stays_on_same_day() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.trading_day_cutoff = Some(TradingDayCutoff { hour: 4, minute: 0 });
    let date = assign_business_date("2025-12-28T09:01:00Z".parse().unwrap(), &config).unwrap();
    assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2025, 12, 28).unwrap());
}

#[test]
fn unknown_timezone_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.business_timezone = "Not/A_Zone".to_string();
    let err = assign_business_date(chrono::Utc::now(), &config).unwrap_err();
    assert!(matches!(err, SplitError::UnknownTimezone(_)));
}

/// Happy path: single date, no spill.
#[test]
fn single_date_all_rows_produces_one_split_file_and_no_spill() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let rows: Vec<RawRow> = (0..500)
        .map(|i| row_at("2025-12-27T18:00:00Z", &format!("row-{i}")))
        .collect();
    let target = chrono::NaiveDate::from_ymd_opt(2025, 12, 27).unwrap();

    let outcome = split(
        &rows,
        &header(),
        &[target],
        &config,
        &config.paths.staging_dir,
        &config.paths.spill_dir,
    )
    .unwrap();

    assert_eq!(outcome.rows_per_split_date.get(&target), Some(&500));
    assert!(outcome.spill_files.is_empty());
    assert_eq!(outcome.past_drop_rows, 0);
    assert!(outcome.split_files[&target].exists());
}

/// Rows beyond the target date become spill.
#[test]
fn future_dated_rows_become_spill() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut rows: Vec<RawRow> = (0..500)
        .map(|i| row_at("2025-12-27T18:00:00Z", &format!("row-{i}")))
        .collect();
    rows.extend((0..23).map(|i| row_at("2025-12-28T18:00:00Z", &format!("spill-{i}"))));
    let target = chrono::NaiveDate::from_ymd_opt(2025, 12, 27).unwrap();

    let outcome = split(
        &rows,
        &header(),
        &[target],
        &config,
        &config.paths.staging_dir,
        &config.paths.spill_dir,
    )
    .unwrap();

    assert_eq!(outcome.rows_per_split_date[&target], 500);
    let spill_date = chrono::NaiveDate::from_ymd_opt(2025, 12, 28).unwrap();
    assert_eq!(outcome.rows_per_spill_date[&spill_date], 23);
    let spill_path = outcome.spill_files[&spill_date].clone();
    assert!(spill_path
        .to_string_lossy()
        .contains("BookKeeping_raw_spill_2025-12-28"));
}

/// Rows earlier than the requested window are a "past drop": logged
/// and discarded rather than retained or re-merged.
#[test]
fn past_dated_rows_are_dropped_not_duplicated() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut rows: Vec<RawRow> = vec![row_at("2025-12-26T18:00:00Z", "stale")];
    rows.extend((0..10).map(|i| row_at("2025-12-27T18:00:00Z", &format!("row-{i}"))));
    let target = chrono::NaiveDate::from_ymd_opt(2025, 12, 27).unwrap();

    let outcome = split(
        &rows,
        &header(),
        &[target],
        &config,
        &config.paths.staging_dir,
        &config.paths.spill_dir,
    )
    .unwrap();

    assert_eq!(outcome.past_drop_rows, 1);
    assert_eq!(outcome.rows_per_split_date[&target], 10);
}

/// Row-count conservation: every row lands in exactly one
/// of split / spill / past-drop.
#[test]
fn every_row_is_accounted_for_exactly_once() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let mut rows: Vec<RawRow> = vec![row_at("2025-12-25T18:00:00Z", "past")];
    rows.extend((0..7).map(|i| row_at("2025-12-27T18:00:00Z", &format!("in-window-{i}"))));
    rows.extend((0..3).map(|i| row_at("2025-12-29T18:00:00Z", &format!("spill-{i}"))));
    let total = rows.len();
    let target = chrono::NaiveDate::from_ymd_opt(2025, 12, 27).unwrap();

    let outcome = split(
        &rows,
        &header(),
        &[target],
        &config,
        &config.paths.staging_dir,
        &config.paths.spill_dir,
    )
    .unwrap();

    let accounted: usize = outcome.rows_per_split_date.values().sum::<usize>()
        + outcome.rows_per_spill_date.values().sum::<usize>()
        + outcome.past_drop_rows;
    assert_eq!(accounted, total);
}

#[test]
fn merge_spill_combines_split_and_spill_rows_with_one_header() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let target_rows: Vec<RawRow> = (0..5)
        .map(|i| row_at("2025-12-28T18:00:00Z", &format!("target-{i}")))
        .collect();
    let target = chrono::NaiveDate::from_ymd_opt(2025, 12, 28).unwrap();
    std::fs::create_dir_all(&config.paths.staging_dir).unwrap();
    let split_outcome = split(
        &target_rows,
        &header(),
        &[target],
        &config,
        &config.paths.staging_dir,
        &config.paths.spill_dir,
    )
    .unwrap();
    let split_file = split_outcome.split_files[&target].clone();

    let spill_rows: Vec<RawRow> = (0..3)
        .map(|i| row_at("2025-12-29T18:00:00Z", &format!("spill-{i}")))
        .collect();
    let past_target = chrono::NaiveDate::from_ymd_opt(2025, 12, 28).unwrap();
    let spill_outcome = split(
        &spill_rows,
        &header(),
        &[past_target],
        &config,
        &config.paths.staging_dir,
        &config.paths.spill_dir,
    )
    .unwrap();
    let spill_date = chrono::NaiveDate::from_ymd_opt(2025, 12, 29).unwrap();
    let spill_file = spill_outcome.spill_files[&spill_date].clone();

    let combined = merge_spill(
        &split_file,
        Some(&spill_file),
        &tmp.path().join("combined"),
        target,
    )
    .unwrap()
    .expect("spill present so a combined file is produced");

    let mut reader = csv::Reader::from_path(&combined).unwrap();
    let headers: Vec<&str> = reader.headers().unwrap().iter().collect();
    assert_eq!(headers, vec!["note"]);
    let count = reader.records().count();
    assert_eq!(count, 8);
    // The original spill file is left untouched for re-merge safety.
    assert!(spill_file.exists());
}

/// Boundary behavior: an empty raw file still produces a
/// real (header-only) split file for the target date, so downstream
/// merge/transform never trips over a missing path.
#[test]
fn empty_input_still_produces_a_split_file_for_the_target_date() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let target = chrono::NaiveDate::from_ymd_opt(2025, 12, 27).unwrap();

    let outcome = split(
        &[],
        &header(),
        &[target],
        &config,
        &config.paths.staging_dir,
        &config.paths.spill_dir,
    )
    .unwrap();

    assert_eq!(outcome.rows_per_split_date.get(&target), Some(&0));
    assert_eq!(outcome.past_drop_rows, 0);
    assert!(outcome.spill_files.is_empty());
    let split_file = &outcome.split_files[&target];
    assert!(split_file.exists());

    let mut reader = csv::Reader::from_path(split_file).unwrap();
    let headers: Vec<&str> = reader.headers().unwrap().iter().collect();
    assert_eq!(headers, vec!["note"]);
    assert_eq!(reader.records().count(), 0);
}

#[test]
fn merge_spill_returns_none_when_no_spill_exists() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let rows: Vec<RawRow> = vec![row_at("2025-12-27T18:00:00Z", "only-row")];
    let target = chrono::NaiveDate::from_ymd_opt(2025, 12, 27).unwrap();
    let outcome = split(
        &rows,
        &header(),
        &[target],
        &config,
        &config.paths.staging_dir,
        &config.paths.spill_dir,
    )
    .unwrap();
    let split_file = outcome.split_files[&target].clone();

    let combined = merge_spill(&split_file, None, &tmp.path().join("combined"), target).unwrap();
    assert!(combined.is_none());
}
