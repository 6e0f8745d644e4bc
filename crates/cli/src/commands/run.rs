// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiat run`: direct single-tenant pipeline invocation,
//! serialized against `oiatd` and any other direct run through the same
//! filesystem Run Lock the Job Dispatcher holds.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use oiat_core::{exit_code, DateWindow, InventorySyncMode, RunOptions, TenantScope};
use oiat_daemon::{LockError, RunLock};

use crate::context::Context;
use crate::exit_error::ExitError;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Tenant key, matching `<companies_dir>/<key>.json`.
    #[arg(long)]
    pub tenant: String,

    /// Single target date (mutually exclusive with --from/--to).
    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long)]
    pub from: Option<NaiveDate>,

    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Skip the download phase; reuse split files already on disk.
    #[arg(long)]
    pub skip_download: bool,

    #[arg(long, value_enum)]
    pub inventory_sync_mode: Option<InventorySyncModeArg>,

    #[arg(long)]
    pub bypass_inventory_startdate: bool,

    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum InventorySyncModeArg {
    Inline,
    UploadFast,
}

impl From<InventorySyncModeArg> for InventorySyncMode {
    fn from(m: InventorySyncModeArg) -> Self {
        match m {
            InventorySyncModeArg::Inline => InventorySyncMode::Inline,
            InventorySyncModeArg::UploadFast => InventorySyncMode::UploadFast,
        }
    }
}

/// Resolves `--date` / `--from`+`--to` into a `DateWindow`, rejecting
/// every other combination as invalid usage (exit code 2).
pub fn window_from_args(
    date: Option<NaiveDate>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> std::result::Result<DateWindow, ExitError> {
    match (date, from, to) {
        (Some(d), None, None) => Ok(DateWindow::Single(d)),
        (None, Some(from), Some(to)) => {
            if from > to {
                return Err(ExitError::new(exit_code::BLOCKED_OR_BAD_USAGE, "--from must not be after --to"));
            }
            Ok(DateWindow::Range { from, to })
        }
        (None, None, None) => Err(ExitError::new(
            exit_code::BLOCKED_OR_BAD_USAGE,
            "one of --date or --from/--to is required",
        )),
        _ => Err(ExitError::new(
            exit_code::BLOCKED_OR_BAD_USAGE,
            "--date is mutually exclusive with --from/--to",
        )),
    }
}

/// Acquires the global filesystem Run Lock, translating a held lock into
/// exit code 2 rather than a generic failure.
pub fn acquire_run_lock(ctx: &Context) -> std::result::Result<RunLock, ExitError> {
    RunLock::try_acquire(&ctx.paths.lock_path).map_err(|e| match e {
        LockError::Held(pid) => ExitError::new(
            exit_code::BLOCKED_OR_BAD_USAGE,
            format!("blocked by existing run lock (held by pid {pid:?})"),
        ),
        LockError::Io(io) => ExitError::new(exit_code::GENERIC_FAILURE, io.to_string()),
    })
}

pub async fn run(args: RunArgs) -> Result<i32> {
    let window = window_from_args(args.date, args.from, args.to)?;
    let options = RunOptions {
        skip_download: args.skip_download,
        inventory_sync_mode: args.inventory_sync_mode.map(Into::into),
        bypass_inventory_startdate: args.bypass_inventory_startdate,
        dry_run: args.dry_run,
    };

    let ctx = Context::open()?;
    let _lock = acquire_run_lock(&ctx)?;
    let config = ctx.load_tenant(&args.tenant)?;

    let job = crate::commands::shared::admit_job(
        &ctx,
        TenantScope::One(config.tenant_key.clone()),
        window,
        options,
        "cli:run",
    )?;
    crate::commands::shared::execute_tenant(&ctx, &job, &config).await
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
