// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rusqlite::Connection;

#[test]
fn migrate_creates_all_tables() {
    let conn = Connection::open_in_memory().expect("open");
    migrate(&conn).expect("migrate");

    for table in ["run_job", "run_artifact", "run_schedule", "run_lock"] {
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(count, 1, "missing table {table}");
    }
}

#[test]
fn migrate_twice_is_a_no_op() {
    let conn = Connection::open_in_memory().expect("open");
    migrate(&conn).expect("migrate once");
    migrate(&conn).expect("migrate twice");

    let version: u32 = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .expect("query");
    assert_eq!(version as usize, MIGRATIONS.len());
}
