// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for two quantified invariants, stated here in law
//! form:
//!
//! 1. "For every raw row in a downloaded CSV, the row appears in exactly
//!    one of: a split file, a spill file, or a past-drop log entry" — the
//!    sum of split + spill + past-drop row counts always equals the input
//!    row count, for any mix of dates.
//! 2. "`Upload(normalized) then Upload(normalized)` over the same input
//!    yields identical ledger state and zero new remote documents on the
//!    second call" — idempotence under arbitrary document counts.

use crate::split::{assign_business_date, split, RawRow};
use crate::upload::client::fake::FakeRemoteClient;
use crate::upload::fake_refresher::FakeTokenRefresher;
use crate::upload::{NormalizedRow, UploadEngine, UploadOptions};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use oiat_config::types::{CredentialKeys, TenantPaths};
use oiat_config::CompanyConfig;
use oiat_storage::Ledger;
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(tmp: &TempDir) -> CompanyConfig {
    CompanyConfig {
        tenant_key: "acme".into(),
        display_name: "Acme Downtown".to_string(),
        remote_realm_id: "12345".to_string(),
        business_timezone: "UTC".to_string(),
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

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

proptest! {
    /// Every row lands in exactly one bucket, for any mix of offsets
    /// (negative = past drop, zero = in window, positive = spill) around
    /// a single-date target window.
    #[test]
    fn every_row_assigned_to_exactly_one_bucket(
        offsets in proptest::collection::vec(-3i64..=3i64, 0..200),
    ) {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let target = base_date();

        let rows: Vec<RawRow> = offsets
            .iter()
            .enumerate()
            .map(|(i, offset)| {
                let ts = Utc
                    .from_utc_datetime(&target.and_hms_opt(12, 0, 0).unwrap())
                    + Duration::days(*offset);
                RawRow {
                    fields: vec![format!("row-{i}")],
                    timestamp: ts,
                }
            })
            .collect();
        let header = vec!["note".to_string()];

        let outcome = split(
            &rows,
            &header,
            &[target],
            &config,
            &config.paths.staging_dir,
            &config.paths.spill_dir,
        )
        .unwrap();

        let split_rows: usize = outcome.rows_per_split_date.values().sum();
        let spill_rows: usize = outcome.rows_per_spill_date.values().sum();
        prop_assert_eq!(split_rows + spill_rows + outcome.past_drop_rows, rows.len());

        // Every row assigned to the target date itself must land in the
        // split bucket, never spill or past-drop.
        for row in &rows {
            let date = assign_business_date(row.timestamp, &config).unwrap();
            if date == target {
                prop_assert!(outcome.split_files.contains_key(&target));
            }
        }
    }

    /// Uploading the same normalized rows twice never creates a second
    /// remote document and leaves the ledger unchanged between calls.
    #[test]
    fn upload_is_idempotent(
        n_docs in 1usize..8,
    ) {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let rows: Vec<NormalizedRow> = (0..n_docs)
            .map(|i| NormalizedRow {
                transaction_date: base_date(),
                location: None,
                tender: format!("tender-{i}"),
                item_name: "Widget".to_string(),
                item_category: None,
                quantity: 1.0,
                unit_price_cents: 500,
            })
            .collect();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let client = FakeRemoteClient::new();
            let engine = UploadEngine::new(client.clone());
            let refresher: Arc<dyn crate::upload::TokenRefresher> =
                Arc::new(FakeTokenRefresher::new("tok"));

            let mut ledger = Ledger::load(&config.paths.ledger_path).unwrap();
            let first = engine
                .upload(
                    rows.clone(),
                    &config,
                    &mut ledger,
                    "tok".to_string(),
                    &UploadOptions::default(),
                    refresher.as_ref(),
                )
                .await
                .unwrap();
            prop_assert_eq!(first.created as usize, n_docs);
            prop_assert_eq!(first.skipped_dup, 0);
            let created_after_first = client.create_call_count();

            let mut ledger = Ledger::load(&config.paths.ledger_path).unwrap();
            let second = engine
                .upload(
                    rows.clone(),
                    &config,
                    &mut ledger,
                    "tok".to_string(),
                    &UploadOptions::default(),
                    refresher.as_ref(),
                )
                .await
                .unwrap();
            prop_assert_eq!(second.created, 0);
            prop_assert_eq!(second.skipped_dup as usize, n_docs);
            prop_assert_eq!(client.create_call_count(), created_after_first);
            Ok(())
        })?;
    }
}
