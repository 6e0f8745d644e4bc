// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("migration {version} failed: {message}")]
    Migration { version: u32, message: String },
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("run lock already held by job {0}")]
    LockHeld(String),
}

impl From<StorageError> for oiat_core::PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::LockHeld(_) => oiat_core::PipelineError::LockHeld,
            other => oiat_core::PipelineError::Config(other.to_string()),
        }
    }
}
