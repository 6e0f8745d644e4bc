// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiat run-all`: runs the pipeline for every configured tenant, or an
//! explicit `--tenants` subset, stopping at the first tenant failure
//!.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use oiat_core::{exit_code, RunOptions, TenantScope};

use super::run::{acquire_run_lock, window_from_args};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct RunAllArgs {
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Restrict to these tenant keys instead of every configured tenant.
    #[arg(long, num_args = 1..)]
    pub tenants: Option<Vec<String>>,
}

pub async fn run(args: RunAllArgs) -> Result<i32> {
    let window = window_from_args(args.date, args.from, args.to)?;

    let ctx = Context::open()?;
    let _lock = acquire_run_lock(&ctx)?;

    let configs = match &args.tenants {
        Some(keys) => keys
            .iter()
            .map(|k| ctx.load_tenant(k))
            .collect::<Result<Vec<_>, _>>()?,
        None => ctx.load_all_tenants()?,
    };

    for config in &configs {
        let job = crate::commands::shared::admit_job(
            &ctx,
            TenantScope::One(config.tenant_key.clone()),
            window,
            RunOptions::default(),
            "cli:run-all",
        )?;
        let exit = crate::commands::shared::execute_tenant(&ctx, &job, config).await?;
        if exit != exit_code::SUCCESS {
            return Ok(exit);
        }
    }

    Ok(exit_code::SUCCESS)
}
