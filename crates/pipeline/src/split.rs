// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Date-Split & Spill Store.
//!
//! Splits a raw multi-day CSV into per-date files in the tenant's business
//! timezone, optionally shifting rows before a trading-day cutoff to the
//! prior calendar date. Rows later than the requested window become spill,
//! retained until their date is processed; rows earlier than the window
//! are "past drop" and discarded.

use crate::error::SplitError;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use oiat_config::CompanyConfig;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One raw CSV row plus its header, kept intact through the split so the
/// transformer sees exactly the columns the download produced.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub fields: Vec<String>,
    /// UTC instant the row's timestamp column resolves to.
    pub timestamp: DateTime<Utc>,
}

/// Outcome of splitting one raw download against a requested date window.
#[derive(Debug, Default)]
pub struct SplitOutcome {
    /// Rows assigned to dates inside the requested window, one file each.
    pub split_files: BTreeMap<NaiveDate, PathBuf>,
    /// Rows for dates strictly later than the window's latest date.
    pub spill_files: BTreeMap<NaiveDate, PathBuf>,
    pub rows_per_split_date: BTreeMap<NaiveDate, usize>,
    pub rows_per_spill_date: BTreeMap<NaiveDate, usize>,
    pub past_drop_rows: usize,
}

/// Assigns `timestamp` to a business-timezone calendar date, applying the
/// trading-day cutoff if the tenant configures one.
pub fn assign_business_date(
    timestamp: DateTime<Utc>,
    config: &CompanyConfig,
) -> Result<NaiveDate, SplitError> {
    let tz: chrono_tz::Tz = config
        .business_timezone
        .parse()
        .map_err(|_| SplitError::UnknownTimezone(config.business_timezone.clone()))?;
    let local = timestamp.with_timezone(&tz);
    let date = local.date_naive();
    match config.trading_day_cutoff {
        Some(cutoff) if cutoff.shifts_to_prior_day(local.hour(), local.minute()) => {
            Ok(date - chrono::Duration::days(1))
        }
        _ => Ok(date),
    }
}

/// Splits `rows` against the requested `window`, writing one file per
/// in-window date under `staging_dir` and one spill file per future date
/// under `spill_dir`. `header` is written once at the top of every file
///.
pub fn split(
    rows: &[RawRow],
    header: &[String],
    window_dates: &[NaiveDate],
    config: &CompanyConfig,
    staging_dir: &Path,
    spill_dir: &Path,
) -> Result<SplitOutcome, SplitError> {
    let earliest = *window_dates.iter().min().expect("window_dates is non-empty");
    let latest = *window_dates.iter().max().expect("window_dates is non-empty");

    let mut by_date: BTreeMap<NaiveDate, Vec<&RawRow>> = BTreeMap::new();
    let mut past_drop = 0usize;
    for row in rows {
        let date = assign_business_date(row.timestamp, config)?;
        if date < earliest {
            past_drop += 1;
            tracing::info!(%date, "past drop row discarded, belongs to a prior run");
            continue;
        }
        by_date.entry(date).or_default().push(row);
    }

    let mut outcome = SplitOutcome {
        past_drop_rows: past_drop,
        ..Default::default()
    };

    std::fs::create_dir_all(staging_dir)?;
    std::fs::create_dir_all(spill_dir)?;

    for (date, date_rows) in &by_date {
        if *date <= latest {
            let path = staging_dir.join(format!("BookKeeping_{date}.csv"));
            write_rows_atomic(&path, header, date_rows)?;
            outcome.rows_per_split_date.insert(*date, date_rows.len());
            outcome.split_files.insert(*date, path);
        } else {
            let path = spill_dir.join(format!("BookKeeping_raw_spill_{date}.csv"));
            write_rows_atomic(&path, header, date_rows)?;
            outcome.rows_per_spill_date.insert(*date, date_rows.len());
            outcome.spill_files.insert(*date, path);
            tracing::info!(%date, rows = date_rows.len(), "spill_created");
        }
    }

    // Every requested date gets a split file even when zero rows were
    // assigned to it, so downstream merge/transform always has a real
    // (possibly header-only) CSV to read rather than a missing path
    //.
    for date in window_dates {
        if outcome.split_files.contains_key(date) {
            continue;
        }
        let path = staging_dir.join(format!("BookKeeping_{date}.csv"));
        let empty: [&RawRow; 0] = [];
        write_rows_atomic(&path, header, &empty)?;
        outcome.rows_per_split_date.insert(*date, 0);
        outcome.split_files.insert(*date, path);
    }

    Ok(outcome)
}

/// Merges the split file for `date` with its matching spill file, if one
/// exists, producing a single combined file whose rows the transformer
/// reads. Returns `None` when there is no spill to merge (the split file
/// alone is the transformer's input). The spill file itself is left
/// untouched: it is archived by the caller only after the date's run
/// succeeds end to end.
pub fn merge_spill(
    split_file: &Path,
    spill_file: Option<&Path>,
    combined_dir: &Path,
    date: NaiveDate,
) -> Result<Option<PathBuf>, SplitError> {
    let Some(spill_file) = spill_file else {
        return Ok(None);
    };
    if !spill_file.exists() {
        return Ok(None);
    }

    std::fs::create_dir_all(combined_dir)?;
    let combined_path = combined_dir.join(format!("BookKeeping_combined_{date}.csv"));
    let tmp_path = combined_path.with_extension("tmp");

    let target_rows = count_data_rows(split_file)?;
    let spill_rows = count_data_rows(spill_file)?;

    {
        let mut out = std::fs::File::create(&tmp_path)?;
        let split_contents = std::fs::read(split_file)?;
        out.write_all(&split_contents)?;

        let mut spill_reader = csv::ReaderBuilder::new().from_path(spill_file)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        for record in spill_reader.records() {
            let record = record.map_err(|e| SplitError::MergeFailed {
                date: date.to_string(),
                reason: e.to_string(),
            })?;
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp_path, &combined_path)?;

    let final_rows = target_rows + spill_rows;
    tracing::info!(%date, target_rows, spill_rows, final_rows, "spill_merged");

    Ok(Some(combined_path))
}

fn count_data_rows(path: &Path) -> Result<usize, SplitError> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let mut count = 0;
    for record in reader.records() {
        record?;
        count += 1;
    }
    Ok(count)
}

fn write_rows_atomic(path: &Path, header: &[String], rows: &[&RawRow]) -> Result<(), SplitError> {
    let tmp_path = path.with_extension("tmp");
    {
        let file = std::fs::File::create(&tmp_path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(&row.fields)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "split_tests.rs"]
mod tests;
