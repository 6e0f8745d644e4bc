// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Transformer interface: a pure function from a
//! single-date raw CSV plus tenant config to a normalized document CSV.
//! Column mapping itself is out of scope; the orchestrator
//! only depends on this trait, never a concrete implementation, matching
//! the adapter/fake-adapter split used elsewhere in this workspace.

use crate::error::TransformError;
use chrono::NaiveDate;
use oiat_config::CompanyConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct TransformStats {
    pub rows_in: u64,
    pub rows_out: u64,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub normalized_file: PathBuf,
    pub stats: TransformStats,
}

/// Stateless: no network, no persistent state. A failure here is fatal
/// for the (tenant, date) it was invoked for.
pub trait Transformer: Send + Sync {
    fn transform(
        &self,
        raw_file: &Path,
        config: &CompanyConfig,
        target_date: NaiveDate,
    ) -> Result<TransformOutput, TransformError>;
}

/// Production [`Transformer`]: shells out to an external command that owns
/// the column-mapping logic,
/// invoked as `<cmd> --tenant <key> --date <date> --in <raw> --out <normalized>`.
/// The command's stdout, if non-empty, is parsed as the `rows_in`/`rows_out`
/// counters the orchestrator records against `Phase::Transform`; when the
/// command prints nothing, the counters fall back to the normalized file's
/// own row count.
pub struct ExternalTransformer {
    command: PathBuf,
    output_dir: PathBuf,
}

impl ExternalTransformer {
    pub fn new(command: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            output_dir: output_dir.into(),
        }
    }
}

impl Transformer for ExternalTransformer {
    fn transform(
        &self,
        raw_file: &Path,
        config: &CompanyConfig,
        target_date: NaiveDate,
    ) -> Result<TransformOutput, TransformError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let normalized_file = self
            .output_dir
            .join(format!("normalized_{}_{target_date}.csv", config.tenant_key));

        let output = std::process::Command::new(&self.command)
            .arg("--tenant")
            .arg(config.tenant_key.as_str())
            .arg("--date")
            .arg(target_date.to_string())
            .arg("--in")
            .arg(raw_file)
            .arg("--out")
            .arg(&normalized_file)
            .output()
            .map_err(|e| TransformError::MalformedRow(format!("failed to spawn transform command: {e}")))?;
        if !output.status.success() {
            return Err(TransformError::MalformedRow(format!(
                "transform command exited with {}",
                output.status
            )));
        }

        let stats = match parse_stats(&output.stdout) {
            Some(stats) => stats,
            None => {
                let rows_out = count_csv_data_rows(&normalized_file)?;
                TransformStats {
                    rows_in: rows_out,
                    rows_out,
                }
            }
        };

        Ok(TransformOutput {
            normalized_file,
            stats,
        })
    }
}

fn parse_stats(stdout: &[u8]) -> Option<TransformStats> {
    #[derive(serde::Deserialize)]
    struct Stats {
        rows_in: u64,
        rows_out: u64,
    }
    let text = std::str::from_utf8(stdout).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    let stats: Stats = serde_json::from_str(text).ok()?;
    Some(TransformStats {
        rows_in: stats.rows_in,
        rows_out: stats.rows_out,
    })
}

fn count_csv_data_rows(path: &Path) -> Result<u64, TransformError> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let mut count = 0u64;
    for record in reader.records() {
        record?;
        count += 1;
    }
    Ok(count)
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct FakeTransformCall {
        pub raw_file: PathBuf,
        pub target_date: NaiveDate,
    }

    #[derive(Default)]
    struct FakeState {
        calls: Vec<FakeTransformCall>,
    }

    /// Copies the raw file verbatim to `normalized_file` and reports the
    /// input row count as both `rows_in` and `rows_out`, standing in for
    /// column-mapping logic that is out of scope for this crate.
    #[derive(Clone)]
    pub struct FakeTransformer {
        output_dir: PathBuf,
        state: Arc<Mutex<FakeState>>,
        fail_next: Arc<Mutex<Option<TransformErrorKind>>>,
    }

    #[derive(Debug, Clone, Copy)]
    pub enum TransformErrorKind {
        MalformedRow,
    }

    impl FakeTransformer {
        pub fn new(output_dir: impl Into<PathBuf>) -> Self {
            Self {
                output_dir: output_dir.into(),
                state: Arc::new(Mutex::new(FakeState::default())),
                fail_next: Arc::new(Mutex::new(None)),
            }
        }

        pub fn calls(&self) -> Vec<FakeTransformCall> {
            self.state.lock().calls.clone()
        }

        pub fn fail_next_call(&self, kind: TransformErrorKind) {
            *self.fail_next.lock() = Some(kind);
        }
    }

    impl Transformer for FakeTransformer {
        fn transform(
            &self,
            raw_file: &Path,
            _config: &CompanyConfig,
            target_date: NaiveDate,
        ) -> Result<TransformOutput, TransformError> {
            self.state.lock().calls.push(FakeTransformCall {
                raw_file: raw_file.to_path_buf(),
                target_date,
            });

            if self.fail_next.lock().take().is_some() {
                return Err(TransformError::MalformedRow(
                    "fake transformer forced failure".to_string(),
                ));
            }

            std::fs::create_dir_all(&self.output_dir)?;
            let normalized_file = self
                .output_dir
                .join(format!("normalized_{target_date}.csv"));

            let mut reader = csv::ReaderBuilder::new().from_path(raw_file)?;
            let headers = reader.headers()?.clone();
            let mut writer = csv::Writer::from_path(&normalized_file)?;
            writer.write_record(&headers)?;

            let mut rows_in = 0u64;
            for record in reader.records() {
                let record = record?;
                writer.write_record(&record)?;
                rows_in += 1;
            }
            writer.flush()?;

            Ok(TransformOutput {
                normalized_file,
                stats: TransformStats {
                    rows_in,
                    rows_out: rows_in,
                },
            })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransformCall, FakeTransformer, TransformErrorKind};

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
