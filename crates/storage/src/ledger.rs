// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tenant ledger of document numbers accepted by the remote accounting
//! service. A plain JSON file, not the sqlite store:
//! the Upload Engine checks it on the hot path for every candidate
//! document and a flat `HashSet` load is simpler to reason about there
//! than a query. Writes are atomic (write-temp-then-rename) so a crash
//! mid-write never leaves a half-written ledger visible at its final path.

use crate::error::StorageError;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
struct LedgerFile {
    doc_numbers: HashSet<String>,
}

pub struct Ledger {
    path: PathBuf,
    entries: HashSet<String>,
}

impl Ledger {
    /// Reads tolerate a missing file as an empty set.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<LedgerFile>(&raw)?.doc_numbers,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn contains(&self, doc_number: &str) -> bool {
        self.entries.contains(doc_number)
    }

    /// Adds `doc_number` and persists immediately: every document accepted
    /// by the remote service must appear in the
    /// ledger before the upload is considered complete.
    pub fn add(&mut self, doc_number: impl Into<String>) -> Result<(), StorageError> {
        self.entries.insert(doc_number.into());
        self.persist()
    }

    /// Removes entries absent from a freshly queried remote snapshot
    /// ("stale ledger entry" healing). Returns the entries
    /// that were removed, for logging.
    pub fn heal_stale(&mut self, found_in_remote: &HashSet<String>) -> Result<Vec<String>, StorageError> {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|d| !found_in_remote.contains(*d))
            .cloned()
            .collect();
        if stale.is_empty() {
            return Ok(stale);
        }
        for doc in &stale {
            self.entries.remove(doc);
        }
        self.persist()?;
        Ok(stale)
    }

    /// A clone of every entry currently recorded, for callers that need to
    /// scope a [`Ledger::heal_stale`] pass to a subset of the ledger (e.g.
    /// only the documents a given upload run touched).
    pub fn snapshot(&self) -> HashSet<String> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<(), StorageError> {
        write_atomic(&self.path, &LedgerFile {
            doc_numbers: self.entries.clone(),
        })
    }
}

fn write_atomic(path: &Path, contents: &LedgerFile) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let mut tmp = std::fs::File::create(&tmp_path)?;
    let json = serde_json::to_vec_pretty(contents)?;
    tmp.write_all(&json)?;
    tmp.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
