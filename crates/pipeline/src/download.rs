// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Downloader interface: fetching the raw POS export itself is an
//! out-of-scope external collaborator. The orchestrator depends only on this trait,
//! matching the Transformer's interface-only treatment.

use crate::error::DownloadError;
use crate::split::RawRow;
use oiat_config::CompanyConfig;
use oiat_core::DateWindow;
use std::path::{Path, PathBuf};

/// A raw multi-day CSV plus the rows read from it, ready for the
/// Date-Split & Spill Store.
pub struct DownloadOutput {
    /// Path to the untouched raw download, archived verbatim as
    /// `ORIGINAL_*` on a successful run.
    pub original_file: PathBuf,
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

pub trait Downloader: Send + Sync {
    fn download(
        &self,
        config: &CompanyConfig,
        window: &DateWindow,
    ) -> Result<DownloadOutput, DownloadError>;
}

/// Production [`Downloader`]: shells out to an external command that owns
/// the headless-browser fetch,
/// the same subprocess-per-call shape `oiat_daemon::dispatcher` uses to
/// spawn the orchestrator itself. The command is invoked as
/// `<cmd> --tenant <key> --from <date> --to <date> --out <path>` and is
/// expected to write a CSV with a `timestamp` column (RFC 3339) to `<path>`.
pub struct ExternalDownloader {
    command: PathBuf,
    output_dir: PathBuf,
}

impl ExternalDownloader {
    pub fn new(command: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            output_dir: output_dir.into(),
        }
    }
}

impl Downloader for ExternalDownloader {
    fn download(
        &self,
        config: &CompanyConfig,
        window: &DateWindow,
    ) -> Result<DownloadOutput, DownloadError> {
        let (from, to) = match window {
            DateWindow::Single(d) => (*d, *d),
            DateWindow::Range { from, to } => (*from, *to),
        };

        std::fs::create_dir_all(&self.output_dir)?;
        let original_file = self
            .output_dir
            .join(format!("ORIGINAL_{}_{from}_{to}.csv", config.tenant_key));

        let status = std::process::Command::new(&self.command)
            .arg("--tenant")
            .arg(config.tenant_key.as_str())
            .arg("--from")
            .arg(from.to_string())
            .arg("--to")
            .arg(to.to_string())
            .arg("--out")
            .arg(&original_file)
            .status()
            .map_err(|e| DownloadError::Fetch(format!("failed to spawn download command: {e}")))?;
        if !status.success() {
            return Err(DownloadError::Fetch(format!(
                "download command exited with {status}"
            )));
        }

        let (header, rows) = read_raw_csv(&original_file)?;
        Ok(DownloadOutput {
            original_file,
            header,
            rows,
        })
    }
}

fn read_raw_csv(path: &Path) -> Result<(Vec<String>, Vec<RawRow>), DownloadError> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| DownloadError::Fetch(e.to_string()))?;
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| DownloadError::Fetch(e.to_string()))?
        .iter()
        .map(String::from)
        .collect();
    let timestamp_idx = header
        .iter()
        .position(|h| h.eq_ignore_ascii_case("timestamp"))
        .ok_or_else(|| DownloadError::Fetch("raw download is missing a timestamp column".to_string()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DownloadError::Fetch(e.to_string()))?;
        let fields: Vec<String> = record.iter().map(String::from).collect();
        let raw_ts = fields
            .get(timestamp_idx)
            .ok_or_else(|| DownloadError::Fetch("row is missing its timestamp field".to_string()))?;
        let timestamp = chrono::DateTime::parse_from_rfc3339(raw_ts)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| DownloadError::Fetch(format!("invalid timestamp {raw_ts:?}: {e}")))?;
        rows.push(RawRow { fields, timestamp });
    }
    Ok((header, rows))
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct FakeDownloadCall {
        pub window: DateWindow,
    }

    #[derive(Default)]
    struct FakeState {
        calls: Vec<FakeDownloadCall>,
    }

    /// Writes `rows` (seeded up front) to a fresh raw file on every call,
    /// standing in for the headless-browser fetch.
    #[derive(Clone)]
    pub struct FakeDownloader {
        output_dir: PathBuf,
        header: Vec<String>,
        rows: Vec<RawRow>,
        state: Arc<Mutex<FakeState>>,
        fail_next: Arc<Mutex<Option<String>>>,
    }

    impl FakeDownloader {
        pub fn new(output_dir: impl Into<PathBuf>, header: Vec<String>, rows: Vec<RawRow>) -> Self {
            Self {
                output_dir: output_dir.into(),
                header,
                rows,
                state: Arc::new(Mutex::new(FakeState::default())),
                fail_next: Arc::new(Mutex::new(None)),
            }
        }

        pub fn calls(&self) -> Vec<FakeDownloadCall> {
            self.state.lock().calls.clone()
        }

        pub fn fail_next_call(&self, message: impl Into<String>) {
            *self.fail_next.lock() = Some(message.into());
        }
    }

    impl Downloader for FakeDownloader {
        fn download(
            &self,
            _config: &CompanyConfig,
            window: &DateWindow,
        ) -> Result<DownloadOutput, DownloadError> {
            self.state.lock().calls.push(FakeDownloadCall { window: *window });

            if let Some(message) = self.fail_next.lock().take() {
                return Err(DownloadError::Fetch(message));
            }

            std::fs::create_dir_all(&self.output_dir)?;
            let original_file = self.output_dir.join("ORIGINAL_download.csv");
            let mut writer = csv::Writer::from_path(&original_file)
                .map_err(|e| DownloadError::Fetch(e.to_string()))?;
            writer
                .write_record(&self.header)
                .map_err(|e| DownloadError::Fetch(e.to_string()))?;
            for row in &self.rows {
                writer
                    .write_record(&row.fields)
                    .map_err(|e| DownloadError::Fetch(e.to_string()))?;
            }
            writer.flush()?;

            Ok(DownloadOutput {
                original_file,
                header: self.header.clone(),
                rows: self.rows.clone(),
            })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeDownloadCall, FakeDownloader};

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
