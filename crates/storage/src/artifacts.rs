// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunArtifact` persistence: created once per tenant-date at orchestrator
//! completion, read-only thereafter. A re-run supersedes the
//! prior artifact rather than overwriting it, preserving the audit trail.

use crate::db::Db;
use crate::error::StorageError;
use oiat_core::{ReconcileStatus, RunArtifact, RunArtifactId};
use rusqlite::{params, Row};

impl Db {
    /// Marks any existing non-superseded artifact for (tenant, date) as
    /// superseded, then inserts the new one, in one transaction.
    pub fn insert_run_artifact(&self, artifact: &RunArtifact) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE run_artifact SET superseded = 1
                 WHERE tenant = ?1 AND target_date = ?2 AND superseded = 0",
                params![artifact.tenant.as_str(), artifact.target_date.to_string()],
            )?;
            tx.execute(
                "INSERT INTO run_artifact (
                    id, run_job_id, tenant, target_date, rows_in, docs_uploaded,
                    docs_skipped_dup, docs_failed, source_total_cents, remote_total_cents,
                    difference_cents, reconcile_status, processed_at_ms, superseded
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,0)",
                params![
                    artifact.id.to_string(),
                    artifact.run_job_id.to_string(),
                    artifact.tenant.as_str(),
                    artifact.target_date.to_string(),
                    artifact.rows_in as i64,
                    artifact.docs_uploaded as i64,
                    artifact.docs_skipped_dup as i64,
                    artifact.docs_failed as i64,
                    artifact.source_total_cents,
                    artifact.remote_total_cents,
                    artifact.difference_cents,
                    artifact.reconcile_status.to_string(),
                    artifact.processed_at_ms as i64,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn list_run_artifacts(&self, tenant: Option<&str>) -> Result<Vec<RunArtifact>, StorageError> {
        self.with_conn(|conn| {
            let rows: Vec<RunArtifact> = match tenant {
                Some(t) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, run_job_id, tenant, target_date, rows_in, docs_uploaded,
                                docs_skipped_dup, docs_failed, source_total_cents, remote_total_cents,
                                difference_cents, reconcile_status, processed_at_ms, superseded
                         FROM run_artifact WHERE tenant = ?1 ORDER BY processed_at_ms DESC",
                    )?;
                    stmt.query_map(params![t], row_to_artifact)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, run_job_id, tenant, target_date, rows_in, docs_uploaded,
                                docs_skipped_dup, docs_failed, source_total_cents, remote_total_cents,
                                difference_cents, reconcile_status, processed_at_ms, superseded
                         FROM run_artifact ORDER BY processed_at_ms DESC",
                    )?;
                    stmt.query_map([], row_to_artifact)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }
}

fn row_to_artifact(row: &Row) -> rusqlite::Result<RunArtifact> {
    let id: String = row.get(0)?;
    let run_job_id: String = row.get(1)?;
    let tenant: String = row.get(2)?;
    let target_date: String = row.get(3)?;
    let rows_in: i64 = row.get(4)?;
    let docs_uploaded: i64 = row.get(5)?;
    let docs_skipped_dup: i64 = row.get(6)?;
    let docs_failed: i64 = row.get(7)?;
    let source_total_cents: i64 = row.get(8)?;
    let remote_total_cents: i64 = row.get(9)?;
    let difference_cents: i64 = row.get(10)?;
    let reconcile_status: String = row.get(11)?;
    let processed_at_ms: i64 = row.get(12)?;
    let superseded: i64 = row.get(13)?;

    Ok(RunArtifact {
        id: RunArtifactId::from_string(id),
        run_job_id: run_job_id.into(),
        tenant: tenant.into(),
        target_date: target_date.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        rows_in: rows_in as u64,
        docs_uploaded: docs_uploaded as u64,
        docs_skipped_dup: docs_skipped_dup as u64,
        docs_failed: docs_failed as u64,
        source_total_cents,
        remote_total_cents,
        difference_cents,
        reconcile_status: parse_reconcile_status(&reconcile_status)?,
        processed_at_ms: processed_at_ms as u64,
        superseded: superseded != 0,
    })
}

fn parse_reconcile_status(s: &str) -> rusqlite::Result<ReconcileStatus> {
    Ok(match s {
        "match" => ReconcileStatus::Match,
        "mismatch" => ReconcileStatus::Mismatch,
        "not_run" => ReconcileStatus::NotRun,
        other => {
            return Err(rusqlite::Error::InvalidColumnType(
                11,
                format!("unknown reconcile status {other}"),
                rusqlite::types::Type::Text,
            ))
        }
    })
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
