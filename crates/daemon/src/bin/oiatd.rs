// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oiatd` — the daemon binary: owns the Run Lock, the Job Dispatcher,
//! the Schedule Worker, and the Operator API listener.
//!
//! Modeled on the companion `ojd` binary's startup sequence: acquire the
//! run lock, set up logging, spawn the listener and worker tasks, then
//! wait on shutdown signals.

use std::sync::Arc;

use clap::Parser;
use oiat_core::SystemClock;
use oiat_daemon::{Dispatcher, ListenerCtx};
use oiat_storage::Db;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "oiatd", about = "Daemon for the odd invoice automation tool")]
struct Args {
    /// Stay attached to the terminal instead of the caller backgrounding it.
    #[arg(long)]
    foreground: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let state_dir = oiat_config::env::state_dir()?;
    let runs_dir = state_dir.join("runs");
    let companies_dir = state_dir.join("companies");
    let logs_dir = state_dir.join("logs");
    let settings_path = state_dir.join("portal_settings.toml");
    let db_path = state_dir.join("oiat.sqlite3");
    let lock_path = state_dir.join(oiat_daemon::env::lock_file_name());
    let socket_path = state_dir.join(oiat_daemon::env::socket_file_name());

    std::fs::create_dir_all(&runs_dir)?;
    std::fs::create_dir_all(&companies_dir)?;
    std::fs::create_dir_all(&logs_dir)?;

    let _log_guard = setup_logging(&logs_dir)?;

    if !args.foreground {
        info!("oiatd started; running as a background process per the caller's supervision");
    }

    let run_lock = match oiat_daemon::RunLock::try_acquire(&lock_path) {
        Ok(lock) => lock,
        Err(oiat_daemon::LockError::Held(pid)) => {
            eprintln!("oiatd is already running (lock held by pid {pid:?})");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let db = Db::open(&db_path)?;
    let settings = oiat_config::load_portal_settings(&settings_path)?;
    let clock = SystemClock;
    let orchestrator_bin = oiat_daemon::dispatcher::find_orchestrator_binary("oiat");
    let reap_stale_after = oiat_daemon::env::reap_stale_after();
    let dispatcher = Arc::new(Dispatcher::with_reap_threshold(
        db.clone(),
        clock.clone(),
        orchestrator_bin,
        runs_dir,
        reap_stale_after,
    ));

    let shutdown = CancellationToken::new();
    let listener_ctx = Arc::new(ListenerCtx::new(
        db.clone(),
        Arc::clone(&dispatcher),
        settings_path,
        companies_dir,
        settings,
        shutdown.clone(),
    ));
    let listener = oiat_daemon::listener::Listener::bind(&socket_path, listener_ctx)?;
    tokio::spawn(listener.run());

    let poll_interval = oiat_config::env::scheduler_poll_seconds();
    let worker = Arc::new(oiat_daemon::ScheduleWorker::new(db, clock, poll_interval));
    tokio::spawn(Arc::clone(&worker).run(Arc::clone(&dispatcher), shutdown.clone()));

    info!(socket = %socket_path.display(), "oiatd ready");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
        _ = shutdown.cancelled() => info!("shutdown requested over the operator api"),
    }

    shutdown.cancel();
    drop(run_lock);
    Ok(())
}

fn setup_logging(logs_dir: &std::path::Path) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::daily(logs_dir, "oiatd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
