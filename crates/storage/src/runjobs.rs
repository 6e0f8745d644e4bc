// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunJob` persistence: insert, status transitions, and listing queries
//! used by the Job Dispatcher and the Operator API.

use crate::db::Db;
use crate::error::StorageError;
use oiat_core::{DateWindow, PhaseRecord, RunJob, RunJobId, RunOptions, RunStatus, TenantScope};
use rusqlite::{params, OptionalExtension, Row};

impl Db {
    pub fn insert_run_job(&self, job: &RunJob) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO run_job (
                    id, tenant_scope, window_json, status, requested_by,
                    created_at_ms, started_at_ms, finished_at_ms, pid, exit_code,
                    failure_reason, log_path, cancel_requested, phase_history_json, options_json
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
                params![
                    job.id.to_string(),
                    serde_json::to_string(&job.tenant_scope)?,
                    serde_json::to_string(&job.window)?,
                    job.status.to_string(),
                    job.requested_by,
                    job.created_at_ms as i64,
                    job.started_at_ms.map(|v| v as i64),
                    job.finished_at_ms.map(|v| v as i64),
                    job.pid,
                    job.exit_code,
                    job.failure_reason,
                    job.log_path.to_string_lossy().to_string(),
                    job.cancel_requested as i64,
                    serde_json::to_string(&job.phase_history)?,
                    serde_json::to_string(&job.options)?,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_run_job(&self, id: &RunJobId) -> Result<Option<RunJob>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, tenant_scope, window_json, status, requested_by, created_at_ms,
                        started_at_ms, finished_at_ms, pid, exit_code, failure_reason, log_path,
                        cancel_requested, phase_history_json, options_json
                 FROM run_job WHERE id = ?1",
                params![id.to_string()],
                row_to_run_job,
            )
            .optional()
            .map_err(StorageError::from)
        })
    }

    /// The oldest job with `status = queued`, per §4.8's selection rule.
    pub fn oldest_queued_run_job(&self) -> Result<Option<RunJob>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, tenant_scope, window_json, status, requested_by, created_at_ms,
                        started_at_ms, finished_at_ms, pid, exit_code, failure_reason, log_path,
                        cancel_requested, phase_history_json, options_json
                 FROM run_job WHERE status = 'queued'
                 ORDER BY created_at_ms ASC LIMIT 1",
                [],
                row_to_run_job,
            )
            .optional()
            .map_err(StorageError::from)
        })
    }

    pub fn list_run_jobs(&self, tenant: Option<&str>) -> Result<Vec<RunJob>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_scope, window_json, status, requested_by, created_at_ms,
                        started_at_ms, finished_at_ms, pid, exit_code, failure_reason, log_path,
                        cancel_requested, phase_history_json, options_json
                 FROM run_job ORDER BY created_at_ms DESC",
            )?;
            let rows = stmt
                .query_map([], row_to_run_job)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match tenant {
                None => rows,
                Some(t) => rows
                    .into_iter()
                    .filter(|j| j.tenant_scope.matches(&t.into()))
                    .collect(),
            })
        })
    }

    pub fn list_run_jobs_by_status(&self, status: RunStatus) -> Result<Vec<RunJob>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_scope, window_json, status, requested_by, created_at_ms,
                        started_at_ms, finished_at_ms, pid, exit_code, failure_reason, log_path,
                        cancel_requested, phase_history_json, options_json
                 FROM run_job WHERE status = ?1",
            )?;
            let rows = stmt
                .query_map(params![status.to_string()], row_to_run_job)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flips a queued job to running and inserts the database lock row, in
    /// one transaction, the second transactionally consistent
    /// serialization point after the filesystem lock. Returns `Ok(false)` without
    /// mutating anything if the lock row already exists.
    pub fn try_start_run_job(
        &self,
        id: &RunJobId,
        started_at_ms: u64,
    ) -> Result<bool, StorageError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let existing: Option<String> = tx
                .query_row("SELECT job_id FROM run_lock WHERE owner = 'global'", [], |r| {
                    r.get(0)
                })
                .optional()?;
            if existing.is_some() {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO run_lock (owner, acquired_at_ms, job_id) VALUES ('global', ?1, ?2)",
                params![started_at_ms as i64, id.to_string()],
            )?;
            let changed = tx.execute(
                "UPDATE run_job SET status = 'running', started_at_ms = ?2
                 WHERE id = ?1 AND status = 'queued'",
                params![id.to_string(), started_at_ms as i64],
            )?;
            if changed == 0 {
                return Err(StorageError::NotFound(id.to_string()));
            }
            tx.commit()?;
            Ok(true)
        })
    }

    /// Flips a job to a terminal status and releases the database lock
    /// row in one transaction.
    pub fn finish_run_job(
        &self,
        id: &RunJobId,
        status: RunStatus,
        finished_at_ms: u64,
        exit_code: Option<i32>,
        failure_reason: Option<&str>,
    ) -> Result<(), StorageError> {
        debug_assert!(status.is_terminal(), "finish_run_job requires a terminal status");
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE run_job SET status = ?2, finished_at_ms = ?3, exit_code = ?4, failure_reason = ?5
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    status.to_string(),
                    finished_at_ms as i64,
                    exit_code,
                    failure_reason,
                ],
            )?;
            tx.execute(
                "DELETE FROM run_lock WHERE owner = 'global' AND job_id = ?1",
                params![id.to_string()],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn set_run_job_pid(&self, id: &RunJobId, pid: u32) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE run_job SET pid = ?2 WHERE id = ?1",
                params![id.to_string(), pid],
            )?;
            Ok(())
        })
    }

    pub fn set_run_job_cancel_requested(&self, id: &RunJobId) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE run_job SET cancel_requested = 1 WHERE id = ?1",
                params![id.to_string()],
            )?;
            Ok(())
        })
    }

    pub fn append_phase_record(
        &self,
        id: &RunJobId,
        record: &PhaseRecord,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            let existing: String = conn.query_row(
                "SELECT phase_history_json FROM run_job WHERE id = ?1",
                params![id.to_string()],
                |r| r.get(0),
            )?;
            let mut history: Vec<PhaseRecord> = serde_json::from_str(&existing)?;
            history.push(record.clone());
            conn.execute(
                "UPDATE run_job SET phase_history_json = ?2 WHERE id = ?1",
                params![id.to_string(), serde_json::to_string(&history)?],
            )?;
            Ok(())
        })
    }
}

fn row_to_run_job(row: &Row) -> rusqlite::Result<RunJob> {
    let id: String = row.get(0)?;
    let tenant_scope: String = row.get(1)?;
    let window_json: String = row.get(2)?;
    let status: String = row.get(3)?;
    let requested_by: String = row.get(4)?;
    let created_at_ms: i64 = row.get(5)?;
    let started_at_ms: Option<i64> = row.get(6)?;
    let finished_at_ms: Option<i64> = row.get(7)?;
    let pid: Option<u32> = row.get(8)?;
    let exit_code: Option<i32> = row.get(9)?;
    let failure_reason: Option<String> = row.get(10)?;
    let log_path: String = row.get(11)?;
    let cancel_requested: i64 = row.get(12)?;
    let phase_history_json: String = row.get(13)?;
    let options_json: String = row.get(14)?;

    let tenant_scope: TenantScope = serde_json::from_str(&tenant_scope)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e)))?;
    let window: DateWindow = serde_json::from_str(&window_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e)))?;
    let status = parse_status(&status)?;
    let phase_history: Vec<PhaseRecord> = serde_json::from_str(&phase_history_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e)))?;
    let options: RunOptions = serde_json::from_str(&options_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(RunJob {
        id: RunJobId::from_string(id),
        tenant_scope,
        window,
        status,
        requested_by,
        created_at_ms: created_at_ms as u64,
        started_at_ms: started_at_ms.map(|v| v as u64),
        finished_at_ms: finished_at_ms.map(|v| v as u64),
        pid,
        exit_code,
        failure_reason,
        log_path: log_path.into(),
        cancel_requested: cancel_requested != 0,
        phase_history,
        options,
    })
}

fn parse_status(s: &str) -> rusqlite::Result<RunStatus> {
    Ok(match s {
        "queued" => RunStatus::Queued,
        "running" => RunStatus::Running,
        "succeeded" => RunStatus::Succeeded,
        "failed" => RunStatus::Failed,
        "cancelled" => RunStatus::Cancelled,
        other => {
            return Err(rusqlite::Error::InvalidColumnType(
                3,
                format!("unknown run status {other}"),
                rusqlite::types::Type::Text,
            ))
        }
    })
}

#[cfg(test)]
#[path = "runjobs_tests.rs"]
mod tests;
