// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Pipeline Orchestrator: sequences Download → Split →
//! (per date: Merge → Transform → Upload → Archive → Reconcile), emitting a
//! structured event per phase transition to the run's log file and
//! persisting `RunArtifact`/`PhaseRecord` rows through `oiat-storage`.
//!
//! REDESIGN: phases are an explicit `Phase` enum value rather than a chain
//! of function calls, so every transition can be logged the same way
//! regardless of which phase it is.

use crate::download::{DownloadOutput, Downloader};
use crate::error::OrchestratorError;
use crate::split::{merge_spill, split};
use crate::transform::{TransformOutput, Transformer};
use crate::upload::client::RemoteClient;
use crate::upload::{NormalizedRow, TokenRefresher, UploadEngine, UploadOptions, UploadResult};
use chrono::NaiveDate;
use oiat_config::CompanyConfig;
use oiat_core::{
    Clock, DateWindow, InventorySyncMode as CoreInventorySyncMode, Phase, PhaseOutcome,
    PhaseRecord, ReconcileStatus, RunArtifact, RunArtifactId, RunJob, RunJobId, RunStatus,
};
use oiat_storage::{Db, Ledger};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// One structured event appended to the run's log file. The Operator
/// API's log-tail endpoint reads
/// this same file by byte offset.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    PipelineStarted {
        tenant: String,
        scope: String,
    },
    SpillCreated {
        date: NaiveDate,
        rows: usize,
    },
    SpillMerged {
        date: NaiveDate,
        target_rows: usize,
        spill_rows: usize,
        final_rows: usize,
    },
    UploadSummary {
        date: NaiveDate,
        attempted: u64,
        created: u64,
        skipped: u64,
        failed: u64,
        source_total_cents: i64,
        remote_total_cents: i64,
    },
    Reconcile {
        date: NaiveDate,
        status: ReconcileStatus,
        source_total_cents: i64,
        remote_total_cents: i64,
        difference_cents: i64,
    },
    PipelineSucceeded,
    PipelineFailed {
        reason: String,
    },
}

/// Appends one JSON object per line to the run's log path: a per-run
/// structured log rather than a global materialized-state log.
struct EventLog {
    path: PathBuf,
}

impl EventLog {
    fn append(&self, event: &Event) -> Result<(), OrchestratorError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Bridges `oiat-tokenstore::TokenStore` to the Upload Engine's
/// [`TokenRefresher`] seam. The Upload Engine never sees a concrete token
/// store; it only ever refreshes through this trait object.
pub struct TokenStoreRefresher<CL: Clock> {
    store: Arc<oiat_tokenstore::TokenStore<CL>>,
    key: oiat_tokenstore::TokenKey,
    endpoint: oiat_tokenstore::ProviderEndpoint,
}

impl<CL: Clock> TokenStoreRefresher<CL> {
    pub fn new(
        store: Arc<oiat_tokenstore::TokenStore<CL>>,
        key: oiat_tokenstore::TokenKey,
        endpoint: oiat_tokenstore::ProviderEndpoint,
    ) -> Self {
        Self {
            store,
            key,
            endpoint,
        }
    }

    /// The token obtained once at the start of a run.
    pub async fn initial_token(&self) -> Result<String, crate::error::UploadError> {
        self.store
            .refresh_if_needed(&self.key, &self.endpoint)
            .await
            .map(|r| r.access_token)
            .map_err(|e| crate::error::UploadError::Token(e.to_string()))
    }
}

#[async_trait::async_trait]
impl<CL: Clock> TokenRefresher for TokenStoreRefresher<CL> {
    async fn refresh(&self) -> Result<String, crate::error::UploadError> {
        self.store
            .refresh(&self.key, &self.endpoint)
            .await
            .map(|r| r.access_token)
            .map_err(|e| crate::error::UploadError::Token(e.to_string()))
    }
}

/// Shared dependencies the orchestrator subprocess opens once at startup.
pub struct OrchestratorDeps<CL: Clock> {
    pub db: Db,
    pub clock: CL,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub failure_reason: Option<String>,
    pub artifacts: Vec<RunArtifact>,
}

pub struct Orchestrator<CL: Clock, D: Downloader, T: Transformer, C: RemoteClient> {
    db: Db,
    clock: CL,
    downloader: D,
    transformer: T,
    upload_engine: UploadEngine<C>,
}

fn to_config_sync_mode(m: CoreInventorySyncMode) -> oiat_config::InventorySyncMode {
    match m {
        CoreInventorySyncMode::Inline => oiat_config::InventorySyncMode::Inline,
        CoreInventorySyncMode::UploadFast => oiat_config::InventorySyncMode::UploadFast,
    }
}

impl<CL: Clock, D: Downloader, T: Transformer, C: RemoteClient> Orchestrator<CL, D, T, C> {
    pub fn new(deps: OrchestratorDeps<CL>, downloader: D, transformer: T, client: C) -> Self {
        Self {
            db: deps.db,
            clock: deps.clock,
            downloader,
            transformer,
            upload_engine: UploadEngine::new(client),
        }
    }

    /// Runs the full state machine for `job`. `refresher` is
    /// used both to obtain the run's one initial bearer token and, by the
    /// Upload Engine, its single permitted mid-run refresh.
    pub async fn run(
        &self,
        job: &RunJob,
        config: &CompanyConfig,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<RunOutcome, OrchestratorError> {
        let log = EventLog {
            path: job.log_path.clone(),
        };
        log.append(&Event::PipelineStarted {
            tenant: config.tenant_key.to_string(),
            scope: describe_window(&job.window),
        })?;

        let mut bearer_token = match refresher.refresh().await {
            Ok(t) => t,
            Err(e) => {
                let reason = e.to_string();
                log.append(&Event::PipelineFailed {
                    reason: reason.clone(),
                })?;
                return Ok(RunOutcome {
                    status: RunStatus::Failed,
                    failure_reason: Some(reason),
                    artifacts: Vec::new(),
                });
            }
        };

        let dates = job.window.dates();
        let mut original_file: Option<PathBuf> = None;

        if !job.options.skip_download {
            let started = self.clock.epoch_ms();
            let download_result: Result<DownloadOutput, OrchestratorError> = self
                .downloader
                .download(config, &job.window)
                .map_err(OrchestratorError::from);
            match download_result {
                Ok(output) => {
                    self.record_phase(
                        &job.id,
                        Phase::Download,
                        started,
                        PhaseOutcome::Success,
                        serde_json::json!({ "rows": output.rows.len() }),
                    )?;
                    let split_started = self.clock.epoch_ms();
                    let split_outcome = split(
                        &output.rows,
                        &output.header,
                        &dates,
                        config,
                        &config.paths.staging_dir,
                        &config.paths.spill_dir,
                    )?;
                    self.record_phase(
                        &job.id,
                        Phase::Split,
                        split_started,
                        PhaseOutcome::Success,
                        serde_json::json!({
                            "past_drop_rows": split_outcome.past_drop_rows,
                            "split_dates": split_outcome.split_files.len(),
                            "spill_dates": split_outcome.spill_files.len(),
                        }),
                    )?;
                    for (date, rows) in &split_outcome.rows_per_spill_date {
                        log.append(&Event::SpillCreated {
                            date: *date,
                            rows: *rows,
                        })?;
                    }
                    original_file = Some(output.original_file);
                }
                Err(e) => {
                    self.record_phase(
                        &job.id,
                        Phase::Download,
                        started,
                        PhaseOutcome::Failed {
                            reason: e.to_string(),
                        },
                        serde_json::json!({}),
                    )?;
                    let reason = e.to_string();
                    log.append(&Event::PipelineFailed {
                        reason: reason.clone(),
                    })?;
                    return Ok(RunOutcome {
                        status: RunStatus::Failed,
                        failure_reason: Some(reason),
                        artifacts: Vec::new(),
                    });
                }
            }
        }

        let mut artifacts = Vec::new();
        let mut failure_reason: Option<String> = None;

        for (idx, date) in dates.iter().copied().enumerate() {
            if self
                .db
                .get_run_job(&job.id)?
                .map(|j| j.cancel_requested)
                .unwrap_or(false)
            {
                failure_reason = Some("run was cancelled".to_string());
                break;
            }

            let is_last = idx + 1 == dates.len();
            match self
                .run_date(
                    job,
                    config,
                    date,
                    is_last,
                    original_file.as_deref(),
                    &mut bearer_token,
                    refresher.as_ref(),
                    &log,
                )
                .await
            {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    failure_reason = Some(e.to_string());
                    break;
                }
            }
        }

        let status = if failure_reason.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };

        match &failure_reason {
            Some(reason) => log.append(&Event::PipelineFailed {
                reason: reason.clone(),
            })?,
            None => log.append(&Event::PipelineSucceeded)?,
        }

        Ok(RunOutcome {
            status,
            failure_reason,
            artifacts,
        })
    }

    /// Runs Merge → Transform → Upload → Archive → Reconcile for one date.
    /// A failure here is fatal to the remainder of the run, except `ArchiveError`,
    /// which is logged as a warning and does not fail the date.
    #[allow(clippy::too_many_arguments)]
    async fn run_date(
        &self,
        job: &RunJob,
        config: &CompanyConfig,
        date: NaiveDate,
        is_last_date: bool,
        original_file: Option<&Path>,
        bearer_token: &mut String,
        refresher: &dyn TokenRefresher,
        log: &EventLog,
    ) -> Result<RunArtifact, OrchestratorError> {
        let split_file = config
            .paths
            .staging_dir
            .join(format!("BookKeeping_{date}.csv"));
        let spill_file = config
            .paths
            .spill_dir
            .join(format!("BookKeeping_raw_spill_{date}.csv"));
        let spill_file = spill_file.exists().then_some(spill_file);

        let merge_started = self.clock.epoch_ms();
        let combined_dir = config.paths.staging_dir.join("combined");
        let combined_file = merge_spill(&split_file, spill_file.as_deref(), &combined_dir, date)?;
        if let Some(combined) = &combined_file {
            let target_rows = count_csv_rows(&split_file)?;
            let spill_rows = spill_file
                .as_deref()
                .map(count_csv_rows)
                .transpose()?
                .unwrap_or(0);
            log.append(&Event::SpillMerged {
                date,
                target_rows,
                spill_rows,
                final_rows: target_rows + spill_rows,
            })?;
            let _ = combined;
        }
        self.record_phase(
            &job.id,
            Phase::Merge,
            merge_started,
            PhaseOutcome::Success,
            serde_json::json!({ "merged": combined_file.is_some() }),
        )?;

        let transform_input = combined_file.as_deref().unwrap_or(&split_file);
        let transform_started = self.clock.epoch_ms();
        let transform_output: TransformOutput =
            self.transformer
                .transform(transform_input, config, date)
                .map_err(|e| {
                    let _ = self.record_phase(
                        &job.id,
                        Phase::Transform,
                        transform_started,
                        PhaseOutcome::Failed {
                            reason: e.to_string(),
                        },
                        serde_json::json!({}),
                    );
                    OrchestratorError::from(e)
                })?;
        self.record_phase(
            &job.id,
            Phase::Transform,
            transform_started,
            PhaseOutcome::Success,
            serde_json::json!({
                "rows_in": transform_output.stats.rows_in,
                "rows_out": transform_output.stats.rows_out,
            }),
        )?;

        let normalized_rows = read_normalized_rows(&transform_output.normalized_file)?;

        let mut ledger = Ledger::load(&config.paths.ledger_path)?;
        let upload_options = UploadOptions {
            inventory_sync_mode_override: job
                .options
                .inventory_sync_mode
                .map(to_config_sync_mode),
            bypass_inventory_startdate_override: Some(job.options.bypass_inventory_startdate),
            dry_run: job.options.dry_run,
        };

        let upload_started = self.clock.epoch_ms();
        let upload_result: UploadResult = self
            .upload_engine
            .upload(
                normalized_rows,
                config,
                &mut ledger,
                bearer_token.clone(),
                &upload_options,
                refresher,
            )
            .await
            .map_err(|e| {
                let _ = self.record_phase(
                    &job.id,
                    Phase::Upload,
                    upload_started,
                    PhaseOutcome::Failed {
                        reason: e.to_string(),
                    },
                    serde_json::json!({}),
                );
                OrchestratorError::from(e)
            })?;
        self.record_phase(
            &job.id,
            Phase::Upload,
            upload_started,
            PhaseOutcome::Success,
            serde_json::json!({
                "attempted": upload_result.attempted,
                "created": upload_result.created,
                "skipped_dup": upload_result.skipped_dup,
                "failed": upload_result.failed,
            }),
        )?;
        log.append(&Event::UploadSummary {
            date,
            attempted: upload_result.attempted,
            created: upload_result.created,
            skipped: upload_result.skipped_dup,
            failed: upload_result.failed,
            source_total_cents: upload_result.source_total_cents,
            remote_total_cents: upload_result.remote_total_cents,
        })?;

        let archive_started = self.clock.epoch_ms();
        match self.archive_date(
            config,
            date,
            &split_file,
            combined_file.as_deref(),
            spill_file.as_deref(),
            &transform_output.normalized_file,
            &transform_output.stats,
            is_last_date.then_some(original_file).flatten(),
        ) {
            Ok(()) => {
                self.record_phase(
                    &job.id,
                    Phase::Archive,
                    archive_started,
                    PhaseOutcome::Success,
                    serde_json::json!({}),
                )?;
            }
            Err(reason) => {
                // ArchiveError is logged as a warning and does not fail the
                // run: the upload already completed.
                warn!(%date, %reason, "archive_failed");
                self.record_phase(
                    &job.id,
                    Phase::Archive,
                    archive_started,
                    PhaseOutcome::Failed { reason },
                    serde_json::json!({}),
                )?;
            }
        }

        let tolerance_cents = (config.reconcile_tolerance * 100.0).round() as i64;
        let difference_cents = upload_result.source_total_cents - upload_result.remote_total_cents;
        let reconcile_status = if difference_cents.abs() <= tolerance_cents {
            ReconcileStatus::Match
        } else {
            ReconcileStatus::Mismatch
        };
        let reconcile_started = self.clock.epoch_ms();
        self.record_phase(
            &job.id,
            Phase::Reconcile,
            reconcile_started,
            PhaseOutcome::Success,
            serde_json::json!({ "status": reconcile_status.to_string() }),
        )?;
        log.append(&Event::Reconcile {
            date,
            status: reconcile_status,
            source_total_cents: upload_result.source_total_cents,
            remote_total_cents: upload_result.remote_total_cents,
            difference_cents,
        })?;

        let artifact = RunArtifact {
            id: RunArtifactId::new(),
            run_job_id: job.id,
            tenant: config.tenant_key.clone(),
            target_date: date,
            rows_in: transform_output.stats.rows_in,
            docs_uploaded: upload_result.created,
            docs_skipped_dup: upload_result.skipped_dup,
            docs_failed: upload_result.failed,
            source_total_cents: upload_result.source_total_cents,
            remote_total_cents: upload_result.remote_total_cents,
            difference_cents,
            reconcile_status,
            processed_at_ms: self.clock.epoch_ms(),
            superseded: false,
        };
        self.db.insert_run_artifact(&artifact)?;
        Ok(artifact)
    }

    fn record_phase(
        &self,
        job_id: &RunJobId,
        phase: Phase,
        started_at_ms: u64,
        outcome: PhaseOutcome,
        counts: serde_json::Value,
    ) -> Result<(), OrchestratorError> {
        let record = PhaseRecord {
            phase,
            started_at_ms,
            finished_at_ms: self.clock.epoch_ms(),
            outcome,
            counts: counts.as_object().cloned().unwrap_or_default(),
        };
        self.db.append_phase_record(job_id, &record)?;
        Ok(())
    }

    /// Moves this date's raw inputs and normalized output into
    /// `Uploaded/<date>/` under the tenant's archive directory. The run's
    /// single original
    /// download is archived alongside whichever date is last in the
    /// window, rather than duplicated into every date's folder.
    #[allow(clippy::too_many_arguments)]
    fn archive_date(
        &self,
        config: &CompanyConfig,
        date: NaiveDate,
        split_file: &Path,
        combined_file: Option<&Path>,
        spill_file: Option<&Path>,
        normalized_file: &Path,
        stats: &crate::transform::TransformStats,
        original_file: Option<&Path>,
    ) -> Result<(), String> {
        let dest_dir = config
            .paths
            .archive_dir
            .join("Uploaded")
            .join(date.to_string());
        std::fs::create_dir_all(&dest_dir).map_err(|e| e.to_string())?;

        move_prefixed(split_file, &dest_dir, "RAW_SPLIT_")?;
        if let Some(combined) = combined_file {
            move_prefixed(combined, &dest_dir, "RAW_COMBINED_")?;
        }
        if let Some(spill) = spill_file {
            move_prefixed(spill, &dest_dir, "RAW_SPILL_")?;
        }
        move_prefixed(normalized_file, &dest_dir, "")?;
        if let Some(original) = original_file {
            move_prefixed(original, &dest_dir, "ORIGINAL_")?;
        }

        let metadata_path = dest_dir.join("transform_metadata.json");
        let metadata = serde_json::json!({
            "target_date": date.to_string(),
            "rows_in": stats.rows_in,
            "rows_out": stats.rows_out,
        });
        std::fs::write(
            &metadata_path,
            serde_json::to_vec_pretty(&metadata).map_err(|e| e.to_string())?,
        )
        .map_err(|e| e.to_string())?;

        Ok(())
    }
}

fn move_prefixed(src: &Path, dest_dir: &Path, prefix: &str) -> Result<(), String> {
    let file_name = src
        .file_name()
        .ok_or_else(|| format!("archive source has no file name: {}", src.display()))?
        .to_string_lossy()
        .to_string();
    let dest = dest_dir.join(format!("{prefix}{file_name}"));
    std::fs::rename(src, &dest).map_err(|e| format!("failed to archive {}: {e}", src.display()))
}

fn count_csv_rows(path: &Path) -> Result<usize, OrchestratorError> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| crate::error::SplitError::Csv(e))?;
    let mut count = 0;
    for record in reader.records() {
        record.map_err(crate::error::SplitError::Csv)?;
        count += 1;
    }
    Ok(count)
}

fn read_normalized_rows(path: &Path) -> Result<Vec<NormalizedRow>, OrchestratorError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| crate::error::TransformError::Csv(e))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: NormalizedRow = record.map_err(|e| crate::error::TransformError::Csv(e))?;
        rows.push(row);
    }
    Ok(rows)
}

fn describe_window(window: &DateWindow) -> String {
    match window {
        DateWindow::Single(d) => d.to_string(),
        DateWindow::Range { from, to } => format!("{from}..{to}"),
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
