// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forward-only SQL schema migrations.
//!
//! No rollback, no branching: each migration is a single `CREATE TABLE`/
//! `ALTER TABLE` statement applied in order, guarded by a `schema_version`
//! row so re-running against an already-migrated database is a no-op.
//! This is deliberately not a general migration engine.

use crate::error::StorageError;
use rusqlite::Connection;

const MIGRATIONS: &[&str] = &[
    // v1: run_job
    r#"
    CREATE TABLE run_job (
        id              TEXT PRIMARY KEY,
        tenant_scope    TEXT NOT NULL,
        window_json     TEXT NOT NULL,
        status          TEXT NOT NULL,
        requested_by    TEXT NOT NULL,
        created_at_ms   INTEGER NOT NULL,
        started_at_ms   INTEGER,
        finished_at_ms  INTEGER,
        pid             INTEGER,
        exit_code       INTEGER,
        failure_reason  TEXT,
        log_path        TEXT NOT NULL,
        cancel_requested INTEGER NOT NULL DEFAULT 0,
        phase_history_json TEXT NOT NULL DEFAULT '[]',
        options_json    TEXT NOT NULL DEFAULT '{}'
    );
    CREATE INDEX run_job_status_idx ON run_job(status);
    CREATE INDEX run_job_created_idx ON run_job(created_at_ms);
    "#,
    // v2: run_artifact
    r#"
    CREATE TABLE run_artifact (
        id                  TEXT PRIMARY KEY,
        run_job_id          TEXT NOT NULL,
        tenant              TEXT NOT NULL,
        target_date         TEXT NOT NULL,
        rows_in             INTEGER NOT NULL,
        docs_uploaded       INTEGER NOT NULL,
        docs_skipped_dup    INTEGER NOT NULL,
        docs_failed         INTEGER NOT NULL,
        source_total_cents  INTEGER NOT NULL,
        remote_total_cents  INTEGER NOT NULL,
        difference_cents    INTEGER NOT NULL,
        reconcile_status    TEXT NOT NULL,
        processed_at_ms     INTEGER NOT NULL,
        superseded          INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX run_artifact_tenant_date_idx ON run_artifact(tenant, target_date);
    "#,
    // v3: run_schedule
    r#"
    CREATE TABLE run_schedule (
        id                  TEXT PRIMARY KEY,
        cron_expression     TEXT NOT NULL,
        timezone            TEXT NOT NULL,
        tenant_scope        TEXT NOT NULL,
        enabled             INTEGER NOT NULL,
        last_evaluated_ms   INTEGER,
        next_fire_ms        INTEGER
    );
    "#,
    // v4: run_lock, the database-side half of the Run Lock (§4.2). A
    // single row keyed by the literal owner "global" is inserted in the
    // same transaction that flips a RunJob from queued to running.
    r#"
    CREATE TABLE run_lock (
        owner           TEXT PRIMARY KEY,
        acquired_at_ms  INTEGER NOT NULL,
        job_id          TEXT NOT NULL
    );
    "#,
];

/// Applies any migration with `version > current schema_version`, in
/// order, inside one transaction per migration. Safe to call on every
/// process start: an already-migrated database applies zero statements.
pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
         INSERT INTO schema_version (version)
            SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM schema_version);",
    )?;

    let current: u32 = conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    for (idx, migration) in MIGRATIONS.iter().enumerate() {
        let version = (idx + 1) as u32;
        if version <= current {
            continue;
        }
        conn.execute_batch(migration)
            .map_err(|e| StorageError::Migration {
                version,
                message: e.to_string(),
            })?;
        conn.execute("UPDATE schema_version SET version = ?1", [version])?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
