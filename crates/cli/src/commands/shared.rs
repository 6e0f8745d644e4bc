// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared per-tenant execution: admits one `RunJob` through the database
//! lock row, runs it through the Pipeline Orchestrator, persists its
//! terminal status, and fires the tenant's notification webhook. This is
//! the common tail shared by `run`, `run-all`, and `run-job`
//!.

use anyhow::{Context as _, Result};
use oiat_config::CompanyConfig;
use oiat_core::{
    exit_code, Clock, DateWindow, RunArtifact, RunJob, RunJobId, RunOptions, RunStatus,
    TenantScope,
};
use oiat_notify::{NotificationSink, RunCounts, RunSummary, WebhookNotificationSink};
use oiat_pipeline::RunOutcome;

use crate::context::Context;
use crate::exit_error::ExitError;

/// Truncates to the `RunJob::failure_reason` budget of roughly 200 chars
///.
fn truncate_reason(reason: &str) -> String {
    if reason.chars().count() <= 200 {
        reason.to_string()
    } else {
        reason.chars().take(197).collect::<String>() + "..."
    }
}

pub fn describe_window(window: &DateWindow) -> String {
    match window {
        DateWindow::Single(d) => d.to_string(),
        DateWindow::Range { from, to } => format!("{from}..{to}"),
    }
}

fn summarize(tenant: &str, scope: &str, status: RunStatus, artifacts: &[RunArtifact]) -> RunSummary {
    let mut counts = RunCounts::default();
    let mut source_total_cents = 0i64;
    let mut remote_total_cents = 0i64;
    let mut difference_cents = 0i64;
    let mut reconcile_status = oiat_core::ReconcileStatus::NotRun;
    for artifact in artifacts {
        counts.rows_in += artifact.rows_in;
        counts.docs_uploaded += artifact.docs_uploaded;
        counts.docs_skipped_dup += artifact.docs_skipped_dup;
        counts.docs_failed += artifact.docs_failed;
        source_total_cents += artifact.source_total_cents;
        remote_total_cents += artifact.remote_total_cents;
        difference_cents += artifact.difference_cents;
        if artifact.reconcile_status == oiat_core::ReconcileStatus::Mismatch {
            reconcile_status = oiat_core::ReconcileStatus::Mismatch;
        } else if reconcile_status == oiat_core::ReconcileStatus::NotRun {
            reconcile_status = artifact.reconcile_status;
        }
    }
    RunSummary {
        tenant: tenant.to_string(),
        scope: scope.to_string(),
        status: status.to_string(),
        counts,
        source_total_cents,
        remote_total_cents,
        reconcile_status,
        difference_cents,
    }
}

/// Inserts a `RunJob` row and atomically flips it to `Running` under the
/// database's global run-lock row (`oiat_storage::runjobs::try_start_run_job`).
/// A `false` result means some other job already holds that row — blocked,
/// not a failure of this job.
pub fn admit_job(
    ctx: &Context,
    tenant_scope: TenantScope,
    window: DateWindow,
    options: RunOptions,
    requested_by: &str,
) -> Result<RunJob> {
    let id = RunJobId::new();
    let now = ctx.clock.epoch_ms();
    let job = RunJob {
        id: id.clone(),
        tenant_scope,
        window,
        status: RunStatus::Queued,
        requested_by: requested_by.to_string(),
        created_at_ms: now,
        started_at_ms: None,
        finished_at_ms: None,
        pid: Some(std::process::id()),
        exit_code: None,
        failure_reason: None,
        log_path: ctx.paths.runs_dir.join(format!("{id}.jsonl")),
        cancel_requested: false,
        phase_history: Vec::new(),
        options,
    };
    ctx.db.insert_run_job(&job).context("inserting run job")?;
    let started = ctx
        .db
        .try_start_run_job(&job.id, now)
        .context("starting run job")?;
    if !started {
        return Err(ExitError::new(exit_code::BLOCKED_OR_BAD_USAGE, "blocked by existing run lock").into());
    }
    Ok(job)
}

/// Runs `config` through the Pipeline Orchestrator for `job`, without
/// touching `job`'s persisted status — callers own aggregating and
/// finishing the job (`finish_job`), since one job may cover several
/// tenants (a `TenantScope::All` schedule, see `commands::run_job`).
pub async fn run_pipeline(ctx: &Context, job: &RunJob, config: &CompanyConfig) -> Result<RunOutcome> {
    let (orchestrator, refresher) = crate::context::build_orchestrator(ctx, config)?;
    orchestrator
        .run(job, config, refresher)
        .await
        .context("running pipeline orchestrator")
}

/// Posts `config`'s notification webhook for one tenant's finished run,
/// if it has one configured. Fire-and-forget: a send failure is logged,
/// never propagated.
pub async fn notify_tenant(
    ctx: &Context,
    config: &CompanyConfig,
    scope: &str,
    status: RunStatus,
    artifacts: &[RunArtifact],
) {
    let Some(webhook_url) = ctx.webhook_url(config) else {
        return;
    };
    let summary = summarize(config.tenant_key.as_str(), scope, status, artifacts);
    let sink = WebhookNotificationSink::default();
    if let Err(e) = sink.notify(&webhook_url, &summary).await {
        tracing::warn!(tenant = %config.tenant_key, error = %e, "failed to send run notification");
    }
}

/// Writes `job`'s terminal status, releasing the database lock row
/// (`oiat_storage::runjobs::finish_run_job`), and returns the process
/// exit code that status maps to.
pub fn finish_job(
    ctx: &Context,
    job: &RunJob,
    status: RunStatus,
    failure_reason: Option<String>,
) -> Result<i32> {
    let finished_at_ms = ctx.clock.epoch_ms();
    let exit = match status {
        RunStatus::Succeeded => exit_code::SUCCESS,
        _ => exit_code::GENERIC_FAILURE,
    };
    let reason = failure_reason.as_deref().map(truncate_reason);
    ctx.db
        .finish_run_job(&job.id, status, finished_at_ms, Some(exit), reason.as_deref())
        .context("finishing run job")?;
    Ok(exit)
}

/// Single-tenant convenience used by `run`/`run-all`: run the pipeline,
/// finish the job, notify. `job.tenant_scope` must be `One`.
pub async fn execute_tenant(ctx: &Context, job: &RunJob, config: &CompanyConfig) -> Result<i32> {
    let outcome = run_pipeline(ctx, job, config).await?;
    let exit = finish_job(ctx, job, outcome.status, outcome.failure_reason.clone())?;
    notify_tenant(
        ctx,
        config,
        &describe_window(&job.window),
        outcome.status,
        &outcome.artifacts,
    )
    .await;
    Ok(exit)
}
