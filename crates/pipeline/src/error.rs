// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unknown business timezone: {0}")]
    UnknownTimezone(String),

    #[error("failed to merge spill file for {date}: {reason}")]
    MergeFailed { date: String, reason: String },
}

impl From<SplitError> for oiat_core::PipelineError {
    fn from(e: SplitError) -> Self {
        match &e {
            SplitError::MergeFailed { reason, .. } => {
                oiat_core::PipelineError::SpillMergeError(reason.clone())
            }
            other => oiat_core::PipelineError::SpillMergeError(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch POS export: {0}")]
    Fetch(String),

    #[error("invalid tenant configuration: {0}")]
    ConfigError(String),
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed input row: {0}")]
    MalformedRow(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("token error: {0}")]
    Token(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("remote rejected document: [{code}] {message}")]
    RemoteValidation { code: String, message: String },

    #[error("document blocked by inventory policy: {0}")]
    InventoryBlocked(String),

    #[error("duplicate document detected: {0}")]
    DuplicateDetected(String),

    #[error("invalid tenant configuration: {0}")]
    ConfigError(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] oiat_storage::StorageError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<UploadError> for oiat_core::PipelineError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Token(msg) => oiat_core::PipelineError::TokenRefreshFailed(msg),
            UploadError::Network(msg) => oiat_core::PipelineError::RemoteNetworkError(msg),
            UploadError::RemoteValidation { code, message } => {
                oiat_core::PipelineError::RemoteValidation { code, message }
            }
            UploadError::InventoryBlocked(msg) => oiat_core::PipelineError::InventoryBlocked(msg),
            UploadError::DuplicateDetected(msg) => oiat_core::PipelineError::RemoteValidation {
                code: "duplicate".to_string(),
                message: msg,
            },
            UploadError::ConfigError(msg) => oiat_core::PipelineError::Config(msg),
            UploadError::Ledger(e) => oiat_core::PipelineError::Config(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("failed to archive run artifacts: {0}")]
    Archive(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] oiat_storage::StorageError),

    #[error("run was cancelled")]
    Cancelled,
}

impl From<OrchestratorError> for oiat_core::PipelineError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            // Download has no dedicated ErrorKind since the fetch itself
            // is an out-of-scope external collaborator;
            // it is bucketed with config errors as "fatal at run start,
            // surfaced to the operator".
            OrchestratorError::Download(e) => oiat_core::PipelineError::Config(e.to_string()),
            OrchestratorError::Split(e) => e.into(),
            OrchestratorError::Transform(e) => {
                oiat_core::PipelineError::Config(e.to_string())
            }
            OrchestratorError::Upload(e) => e.into(),
            OrchestratorError::Archive(msg) => oiat_core::PipelineError::ArchiveError(msg),
            OrchestratorError::Io(e) => oiat_core::PipelineError::Io(e),
            OrchestratorError::Storage(e) => e.into(),
            OrchestratorError::Cancelled => {
                oiat_core::PipelineError::Config("run was cancelled".to_string())
            }
        }
    }
}
