// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn load_missing_file_is_an_empty_ledger() {
    let dir = tempdir().expect("tempdir");
    let ledger = Ledger::load(dir.path().join("acme/uploaded_docnumbers.json")).expect("load");
    assert!(ledger.is_empty());
}

#[test]
fn add_then_reload_persists_across_instances() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("uploaded_docnumbers.json");

    let mut ledger = Ledger::load(&path).expect("load");
    ledger.add("INV-2025-12-27-0001").expect("add");
    drop(ledger);

    let reloaded = Ledger::load(&path).expect("reload");
    assert!(reloaded.contains("INV-2025-12-27-0001"));
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn heal_stale_removes_entries_absent_from_remote_snapshot() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("uploaded_docnumbers.json");
    let mut ledger = Ledger::load(&path).expect("load");
    ledger.add("DOC-1").expect("add");
    ledger.add("DOC-2").expect("add");

    let remote: std::collections::HashSet<String> = ["DOC-1".to_string()].into_iter().collect();
    let removed = ledger.heal_stale(&remote).expect("heal");

    assert_eq!(removed, vec!["DOC-2".to_string()]);
    assert!(ledger.contains("DOC-1"));
    assert!(!ledger.contains("DOC-2"));
}

#[test]
fn heal_stale_with_nothing_stale_does_not_rewrite() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("uploaded_docnumbers.json");
    let mut ledger = Ledger::load(&path).expect("load");
    ledger.add("DOC-1").expect("add");

    let remote: std::collections::HashSet<String> = ["DOC-1".to_string()].into_iter().collect();
    let removed = ledger.heal_stale(&remote).expect("heal");
    assert!(removed.is_empty());
}
