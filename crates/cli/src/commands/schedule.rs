// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiat schedule list|create|update|toggle|delete|run-now`: a thin client
//! over the Operator API's schedule management surface,
//! since `RunSchedule` rows are owned and evaluated by `oiatd`'s Schedule
//! Worker, not by direct CLI database access.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use oiat_wire::{Query, Request, Response, ScheduleSummary};

use crate::context::Paths;

#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// List every configured schedule.
    List,
    /// Create a new schedule.
    Create(ScheduleCreateArgs),
    /// Update an existing schedule's cron expression, timezone, or scope.
    Update(ScheduleUpdateArgs),
    /// Enable or disable a schedule without changing its definition.
    Toggle(ScheduleToggleArgs),
    /// Delete a schedule.
    Delete(ScheduleIdArgs),
    /// Enqueue a run immediately from a schedule's configured scope,
    /// bypassing its next cron fire.
    RunNow(ScheduleIdArgs),
}

#[derive(Debug, Args)]
pub struct ScheduleCreateArgs {
    #[arg(long)]
    pub cron: String,
    #[arg(long)]
    pub timezone: String,
    /// `all`, or a single tenant key.
    #[arg(long)]
    pub tenant_scope: String,
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Debug, Args)]
pub struct ScheduleUpdateArgs {
    pub id: String,
    #[arg(long)]
    pub cron: String,
    #[arg(long)]
    pub timezone: String,
    #[arg(long)]
    pub tenant_scope: String,
}

#[derive(Debug, Args)]
pub struct ScheduleToggleArgs {
    pub id: String,
    #[arg(long)]
    pub enabled: bool,
}

#[derive(Debug, Args)]
pub struct ScheduleIdArgs {
    pub id: String,
}

fn print_schedule(s: &ScheduleSummary) {
    println!(
        "{}\t{}\t{}\t{}\t{}",
        s.id,
        s.cron_expression,
        s.timezone,
        s.tenant_scope,
        if s.enabled { "enabled" } else { "disabled" }
    );
}

fn build_request(command: &ScheduleCommand) -> Request {
    match command {
        ScheduleCommand::List => Request::Query { query: Query::ListSchedules },
        ScheduleCommand::Create(args) => Request::ScheduleCreate {
            cron_expression: args.cron.clone(),
            timezone: args.timezone.clone(),
            tenant_scope: args.tenant_scope.clone(),
            enabled: !args.disabled,
        },
        ScheduleCommand::Update(args) => Request::ScheduleUpdate {
            id: args.id.clone(),
            cron_expression: args.cron.clone(),
            timezone: args.timezone.clone(),
            tenant_scope: args.tenant_scope.clone(),
        },
        ScheduleCommand::Toggle(args) => Request::ScheduleToggle {
            id: args.id.clone(),
            enabled: args.enabled,
        },
        ScheduleCommand::Delete(args) => Request::ScheduleDelete { id: args.id.clone() },
        ScheduleCommand::RunNow(args) => Request::ScheduleRunNow { id: args.id.clone() },
    }
}

pub async fn run(command: ScheduleCommand) -> Result<i32> {
    let paths = Paths::resolve()?;
    let request = build_request(&command);
    let response = crate::socket_client::call_checked(&paths.socket_path, &request).await?;
    match response {
        Response::Schedules { schedules } => {
            for s in &schedules {
                print_schedule(s);
            }
        }
        Response::Schedule { schedule } => match schedule {
            Some(s) => print_schedule(&s),
            None => println!("(no such schedule)"),
        },
        Response::Ok => println!("ok"),
        Response::RunQueued { job_id } => println!("queued run {job_id}"),
        Response::RunBlocked { held_by_job_id } => {
            println!("blocked by existing run lock (held by {held_by_job_id:?})");
            return Ok(oiat_core::exit_code::BLOCKED_OR_BAD_USAGE);
        }
        other => bail!("unexpected operator api response: {other:?}"),
    }
    Ok(oiat_core::exit_code::SUCCESS)
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
