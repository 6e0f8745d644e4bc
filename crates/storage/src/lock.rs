// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queries and forced-release operations on the `run_lock` row: the
//! database-side half of the Run Lock. Acquire/release in
//! the normal path goes through `Db::try_start_run_job`/`finish_run_job`;
//! this module covers the reaper's out-of-band path.

use crate::db::Db;
use crate::error::StorageError;
use oiat_core::RunJobId;
use rusqlite::{params, OptionalExtension};

pub struct LockRow {
    pub job_id: RunJobId,
    pub acquired_at_ms: u64,
}

impl Db {
    pub fn current_lock_holder(&self) -> Result<Option<LockRow>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT job_id, acquired_at_ms FROM run_lock WHERE owner = 'global'",
                [],
                |row| {
                    let job_id: String = row.get(0)?;
                    let acquired_at_ms: i64 = row.get(1)?;
                    Ok(LockRow {
                        job_id: RunJobId::from_string(job_id),
                        acquired_at_ms: acquired_at_ms as u64,
                    })
                },
            )
            .optional()
            .map_err(StorageError::from)
        })
    }

    /// Used only by the reaper sweep (`ReapIfStale`), when the recorded
    /// PID is confirmed dead. Unlike `finish_run_job`, this does not
    /// require the lock row to reference `job_id`: a crashed process may
    /// have left a lock row for a job that the caller no longer has a
    /// handle to, so the reaper clears whatever row is present.
    pub fn force_release_lock_row(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM run_lock WHERE owner = 'global'", params![])?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
