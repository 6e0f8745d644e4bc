// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Job Dispatcher: enqueues `RunJob` requests, picks
//! the oldest queued job and spawns the orchestrator as a subprocess, and
//! reconciles `running` jobs whose PID has died.
//!
//! Subprocess-per-run: the Dispatcher spawns a sibling orchestrator
//! binary once per job, resolved the same way a long-running daemon
//! resolves its own sibling executables at startup.

use std::path::PathBuf;
use std::time::Duration;

use oiat_core::{exit_code, Clock, DateWindow, RunJob, RunJobId, RunOptions, RunStatus, TenantScope};
use oiat_storage::{Db, StorageError};
use thiserror::Error;
use tokio::process::Command;
use tracing::warn;

/// A consecutive run of spawn failures this high aborts the dispatch loop
/// for the current tick.
const MAX_CONSECUTIVE_SPAWN_FAILURES: u32 = 5;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to spawn orchestrator subprocess: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A job was picked up and the orchestrator subprocess was spawned.
    Started { job_id: RunJobId, pid: u32 },
    /// The oldest queued job was found but the global lock is already held.
    Queued { job_id: RunJobId },
    /// No queued jobs remain.
    Empty,
    /// The consecutive-failure cap was hit; the caller should back off.
    StartFailed { reason: String },
}

pub struct Dispatcher<C: Clock> {
    db: Db,
    clock: C,
    orchestrator_bin: PathBuf,
    log_dir: PathBuf,
    reap_stale_after: Duration,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(db: Db, clock: C, orchestrator_bin: PathBuf, log_dir: PathBuf) -> Self {
        Self::with_reap_threshold(db, clock, orchestrator_bin, log_dir, crate::env::reap_stale_after())
    }

    pub fn with_reap_threshold(
        db: Db,
        clock: C,
        orchestrator_bin: PathBuf,
        log_dir: PathBuf,
        reap_stale_after: Duration,
    ) -> Self {
        Self {
            db,
            clock,
            orchestrator_bin,
            log_dir,
            reap_stale_after,
        }
    }

    /// `Enqueue`: insert a new queued `RunJob`.
    pub fn enqueue(
        &self,
        tenant_scope: TenantScope,
        window: DateWindow,
        requested_by: impl Into<String>,
        options: RunOptions,
    ) -> Result<RunJobId, DispatchError> {
        let id = RunJobId::new();
        let now = self.clock.epoch_ms();
        let job = RunJob {
            id,
            tenant_scope,
            window,
            status: RunStatus::Queued,
            requested_by: requested_by.into(),
            created_at_ms: now,
            started_at_ms: None,
            finished_at_ms: None,
            pid: None,
            exit_code: None,
            failure_reason: None,
            log_path: self.log_dir.join(format!("{id}.jsonl")),
            cancel_requested: false,
            phase_history: Vec::new(),
            options,
        };
        self.db.insert_run_job(&job)?;
        Ok(id)
    }

    /// `DispatchNext`: start the oldest queued job, looping past spawn
    /// failures (each flipped to `failed`) up to the consecutive-failure
    /// cap.
    pub async fn dispatch_next(&self) -> Result<DispatchOutcome, DispatchError> {
        let mut consecutive_failures = 0u32;
        loop {
            let Some(job) = self.db.oldest_queued_run_job()? else {
                return Ok(DispatchOutcome::Empty);
            };

            let now = self.clock.epoch_ms();
            if !self.db.try_start_run_job(&job.id, now)? {
                return Ok(DispatchOutcome::Queued { job_id: job.id });
            }

            match self.spawn(&job).await {
                Ok(pid) => {
                    self.db.set_run_job_pid(&job.id, pid)?;
                    return Ok(DispatchOutcome::Started { job_id: job.id, pid });
                }
                Err(e) => {
                    let reason = e.to_string();
                    warn!(job_id = %job.id, error = %reason, "failed to spawn orchestrator subprocess");
                    self.db.finish_run_job(
                        &job.id,
                        RunStatus::Failed,
                        self.clock.epoch_ms(),
                        Some(exit_code::SPAWN_FAILED),
                        Some(&reason),
                    )?;
                    consecutive_failures += 1;
                    if consecutive_failures >= MAX_CONSECUTIVE_SPAWN_FAILURES {
                        return Ok(DispatchOutcome::StartFailed { reason });
                    }
                }
            }
        }
    }

    /// `Reconcile`: fail any `running` job whose recorded PID is dead and
    /// has been running longer than `reap_stale_after`. Jobs still within
    /// the grace window are left alone, since a dead PID observed shortly
    /// after start is as likely to be PID-reuse or spawn latency as an
    /// actual crash. Releases both lock halves.
    pub fn reconcile(&self) -> Result<Vec<RunJobId>, DispatchError> {
        let now = self.clock.epoch_ms();
        let stale_after_ms = self.reap_stale_after.as_millis() as u64;
        let mut reaped = Vec::new();
        for job in self.db.list_run_jobs_by_status(RunStatus::Running)? {
            let alive = job.pid.is_some_and(crate::lock::is_process_alive);
            if alive {
                continue;
            }
            let age_ms = job
                .started_at_ms
                .map(|started| now.saturating_sub(started))
                .unwrap_or(u64::MAX);
            if age_ms < stale_after_ms {
                continue;
            }
            warn!(job_id = %job.id, pid = ?job.pid, age_ms, "reaping run job with a dead pid");
            self.db.finish_run_job(
                &job.id,
                RunStatus::Failed,
                now,
                Some(exit_code::REAPED_STALE_PID),
                Some("reaped stale PID"),
            )?;
            reaped.push(job.id);
        }
        Ok(reaped)
    }

    async fn spawn(&self, job: &RunJob) -> Result<u32, std::io::Error> {
        let mut cmd = Command::new(&self.orchestrator_bin);
        cmd.arg("run-job").arg("--job-id").arg(job.id.to_string());
        cmd.kill_on_drop(false);
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::null());
        cmd.stderr(std::process::Stdio::null());
        let child = cmd.spawn()?;
        child.id().ok_or_else(|| {
            std::io::Error::other("spawned orchestrator child has no pid (already reaped)")
        })
    }
}

/// Resolve the orchestrator binary: prefer a sibling of the current executable, falling
/// back to a bare name resolved via `PATH`.
pub fn find_orchestrator_binary(sibling_name: &str) -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(sibling_name);
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from(sibling_name)
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
