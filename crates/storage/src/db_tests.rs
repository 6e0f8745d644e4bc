// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn open_creates_parent_dirs_and_migrates() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("qbo_tokens.sqlite");
    let db = Db::open(&path).expect("open");
    assert!(path.exists());
    drop(db);
}

#[cfg(unix)]
#[test]
fn open_restricts_file_permissions_to_owner_rw() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("state.sqlite");
    let _db = Db::open(&path).expect("open");

    let mode = std::fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn in_memory_db_is_usable_without_a_path() {
    let db = Db::in_memory().expect("open");
    assert_eq!(db.path(), std::path::Path::new(""));
}
