// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error taxonomy shared by every crate downstream of orchestration.
//!
//! Each crate defines its own local error enum (`TokenStoreError`,
//! `LedgerError`, `SplitError`, `UploadError`, `LockError`, ...) and
//! converts into [`PipelineError`] at the point where the orchestrator
//! needs a single stable "kind" tag to attach to a `RunJob.failure_reason`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error kind tag, logged alongside tenant/date/phase on every error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigError,
    CredentialMissing,
    TokenRefreshFailed,
    RemoteNetworkError,
    RemoteValidation,
    InventoryBlocked,
    SpillMergeError,
    ArchiveError,
    DispatchStartFailure,
    LockHeld,
}

crate::simple_display! {
    ErrorKind {
        ConfigError => "config_error",
        CredentialMissing => "credential_missing",
        TokenRefreshFailed => "token_refresh_failed",
        RemoteNetworkError => "remote_network_error",
        RemoteValidation => "remote_validation",
        InventoryBlocked => "inventory_blocked",
        SpillMergeError => "spill_merge_error",
        ArchiveError => "archive_error",
        DispatchStartFailure => "dispatch_start_failure",
        LockHeld => "lock_held",
    }
}

/// Top-level error propagated by the pipeline orchestrator.
///
/// `ArchiveError` and `DispatchStartFailure` are intentionally non-fatal
/// to the enclosing run/dispatch loop per the propagation policy; callers
/// that receive them from a phase continue rather than abort.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed tenant config: {0}")]
    Config(String),

    #[error("required credential not set: {0}")]
    CredentialMissing(String),

    #[error("token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("network error talking to remote accounting service: {0}")]
    RemoteNetworkError(String),

    #[error("remote rejected document: [{code}] {message}")]
    RemoteValidation { code: String, message: String },

    #[error("document blocked by inventory policy: {0}")]
    InventoryBlocked(String),

    #[error("failed to merge spill file: {0}")]
    SpillMergeError(String),

    #[error("failed to archive run artifacts: {0}")]
    ArchiveError(String),

    #[error("failed to start run: {0}")]
    DispatchStartFailure(String),

    #[error("blocked by existing run lock")]
    LockHeld,

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Config(_) => ErrorKind::ConfigError,
            PipelineError::CredentialMissing(_) => ErrorKind::CredentialMissing,
            PipelineError::TokenRefreshFailed(_) => ErrorKind::TokenRefreshFailed,
            PipelineError::RemoteNetworkError(_) => ErrorKind::RemoteNetworkError,
            PipelineError::RemoteValidation { .. } => ErrorKind::RemoteValidation,
            PipelineError::InventoryBlocked(_) => ErrorKind::InventoryBlocked,
            PipelineError::SpillMergeError(_) => ErrorKind::SpillMergeError,
            PipelineError::ArchiveError(_) => ErrorKind::ArchiveError,
            PipelineError::DispatchStartFailure(_) => ErrorKind::DispatchStartFailure,
            PipelineError::LockHeld => ErrorKind::LockHeld,
            PipelineError::Io(_) => ErrorKind::ConfigError,
        }
    }

    /// Truncate to the `failure_reason` length budget (≤200 chars) a
    /// `RunJob` may carry.
    pub fn failure_reason(&self) -> String {
        let full = self.to_string();
        if full.chars().count() <= 200 {
            full
        } else {
            full.chars().take(197).collect::<String>() + "..."
        }
    }

    /// Whether this error should abort the run immediately (correctness
    /// compromised) versus being recoverable per the propagation policy.
    pub fn is_fatal_to_run(&self) -> bool {
        !matches!(
            self,
            PipelineError::RemoteValidation { .. } | PipelineError::ArchiveError(_)
        )
    }
}

/// Process exit codes, per the orchestrator's CLI contract.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERIC_FAILURE: i32 = 1;
    pub const BLOCKED_OR_BAD_USAGE: i32 = 2;
    pub const SPAWN_FAILED: i32 = 3;
    pub const COMMAND_UNUSABLE: i32 = 126;
    pub const COMMAND_NOT_FOUND: i32 = 127;
    pub const REAPED_STALE_PID: i32 = -1;
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
