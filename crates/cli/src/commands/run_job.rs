// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiat run-job --job-id <id>`: the subprocess entrypoint the daemon's
//! Job Dispatcher spawns once it has already admitted the job through
//! the database lock row. Unlike `run`/`run-all`, this
//! command never touches the filesystem Run Lock itself — the daemon
//! already holds it for its entire process lifetime.
//!
//! A schedule's `tenant_scope` can be `TenantScope::All`,
//! which the Schedule Worker enqueues as a single `RunJob` rather than
//! fanning out at dispatch time. This command is where that fan-out
//! actually happens: every configured tenant is run in turn under the
//! same job row, continuing past a single tenant's failure so one bad
//! tenant config doesn't silently skip the rest of an unattended
//! scheduled run.

use anyhow::{Context as _, Result};
use clap::Args;
use oiat_core::{exit_code, RunJobId, RunStatus, TenantScope};

use crate::context::Context;
use crate::exit_error::ExitError;

#[derive(Debug, Args)]
pub struct RunJobArgs {
    #[arg(long = "job-id")]
    pub job_id: String,
}

pub async fn run(args: RunJobArgs) -> Result<i32> {
    let ctx = Context::open()?;
    let job_id: RunJobId = args.job_id.as_str().into();
    let job = ctx
        .db
        .get_run_job(&job_id)
        .context("loading run job")?
        .ok_or_else(|| ExitError::new(exit_code::BLOCKED_OR_BAD_USAGE, format!("unknown run job {job_id}")))?;

    if job.status != RunStatus::Running {
        return Err(ExitError::new(
            exit_code::BLOCKED_OR_BAD_USAGE,
            format!("run job {job_id} is not running (status: {})", job.status),
        )
        .into());
    }

    match &job.tenant_scope {
        TenantScope::One(key) => {
            let config = ctx.load_tenant(key.as_str())?;
            crate::commands::shared::execute_tenant(&ctx, &job, &config).await
        }
        TenantScope::All => {
            let configs = ctx.load_all_tenants()?;
            let scope = crate::commands::shared::describe_window(&job.window);

            let mut overall_status = RunStatus::Succeeded;
            let mut overall_reason: Option<String> = None;
            for config in &configs {
                let outcome = crate::commands::shared::run_pipeline(&ctx, &job, config).await?;
                crate::commands::shared::notify_tenant(&ctx, config, &scope, outcome.status, &outcome.artifacts)
                    .await;
                if outcome.status != RunStatus::Succeeded {
                    overall_status = RunStatus::Failed;
                    if overall_reason.is_none() {
                        overall_reason = outcome
                            .failure_reason
                            .clone()
                            .map(|r| format!("{}: {r}", config.tenant_key));
                    }
                }
            }

            crate::commands::shared::finish_job(&ctx, &job, overall_status, overall_reason)
        }
    }
}
