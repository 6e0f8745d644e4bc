// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oiat-pipeline: Date-Split & Spill Store, the Transformer interface, the
//! Upload Engine, and the Pipeline Orchestrator that sequences them
//!.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod download;
pub mod error;
pub mod orchestrator;
pub mod split;
pub mod transform;
pub mod upload;

pub use download::{DownloadOutput, Downloader, ExternalDownloader};
pub use error::{DownloadError, OrchestratorError, SplitError, TransformError, UploadError};
pub use orchestrator::{Event, Orchestrator, OrchestratorDeps, RunOutcome, TokenStoreRefresher};
pub use split::{assign_business_date, merge_spill, split, RawRow, SplitOutcome};
pub use transform::{ExternalTransformer, TransformOutput, TransformStats, Transformer};
pub use upload::{
    client::{HttpRemoteClient, RemoteClient},
    NormalizedRow, TokenRefresher, UploadEngine, UploadOptions, UploadResult,
};

#[cfg(test)]
#[path = "property_tests.rs"]
mod property_tests;
