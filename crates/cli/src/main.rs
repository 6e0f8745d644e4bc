// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiat`: the orchestrator CLI. `run`/`run-all` are the direct,
//! non-daemon invocation paths; `run-job` is the
//! subprocess entrypoint the daemon's Job Dispatcher spawns.

mod color;
mod commands;
mod context;
mod exit_error;
mod socket_client;

use clap::Parser;
use exit_error::ExitError;

#[derive(Debug, Parser)]
#[command(
    name = "oiat",
    about = "Orchestrator CLI for the odd invoice automation tool",
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")"),
    styles = color::styles()
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Run the pipeline for a single tenant.
    Run(commands::run::RunArgs),
    /// Run the pipeline for every configured tenant, fail-fast.
    RunAll(commands::run_all::RunAllArgs),
    /// Execute one already-admitted run job (spawned by `oiatd`).
    RunJob(commands::run_job::RunJobArgs),
    /// OAuth2 token bootstrap and inspection for one tenant.
    Token {
        #[command(subcommand)]
        command: commands::token::TokenCommand,
    },
    /// Manage cron schedules via the running daemon.
    Schedule {
        #[command(subcommand)]
        command: commands::schedule::ScheduleCommand,
    },
    /// Manage tenant company configs via the running daemon.
    Company {
        #[command(subcommand)]
        command: commands::company::CompanyCommand,
    },
    /// Inspect or replace portal-wide settings via the running daemon.
    PortalSettings {
        #[command(subcommand)]
        command: PortalSettingsCommand,
    },
}

#[derive(Debug, clap::Subcommand)]
enum PortalSettingsCommand {
    Show,
    Edit(commands::portal_settings::PortalSettingsEditArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = setup_logging();

    let result = match cli.command {
        Command::Run(args) => commands::run::run(args).await,
        Command::RunAll(args) => commands::run_all::run(args).await,
        Command::RunJob(args) => commands::run_job::run(args).await,
        Command::Token { command } => match command {
            commands::token::TokenCommand::Bootstrap(args) => commands::token::bootstrap(args).await,
            commands::token::TokenCommand::Show(args) => commands::token::show(args).await,
        },
        Command::Schedule { command } => commands::schedule::run(command).await,
        Command::Company { command } => commands::company::run(command).await,
        Command::PortalSettings { command } => match command {
            PortalSettingsCommand::Show => commands::portal_settings::show().await,
            PortalSettingsCommand::Edit(args) => commands::portal_settings::edit(args).await,
        },
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("oiat: {e:#}");
            let code = e
                .downcast_ref::<ExitError>()
                .map(|exit| exit.code)
                .unwrap_or(oiat_core::exit_code::GENERIC_FAILURE);
            std::process::exit(code);
        }
    }
}

fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Ok(state_dir) = oiat_config::env::state_dir() {
        let logs_dir = state_dir.join("logs");
        if std::fs::create_dir_all(&logs_dir).is_ok() {
            let file_appender = tracing_appender::rolling::daily(&logs_dir, "oiat-cli.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking))
                .init();
            return Some(guard);
        }
    }
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
    None
}
