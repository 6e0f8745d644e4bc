// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use super::{
    ArtifactSummary, CompanySummary, PortalSettingsDetail, RunDetail, RunSummary,
    ScheduleSummary,
};

/// Response from the daemon back to a CLI or operator web portal caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Ok,
    Pong,
    Hello { version: String },
    ShuttingDown,
    Error { message: String },

    Runs { runs: Vec<RunSummary> },
    Run { run: Option<Box<RunDetail>> },
    RunLogs {
        content: String,
        /// Byte offset after this content, for incremental polling.
        offset: u64,
    },
    Artifacts { artifacts: Vec<ArtifactSummary> },

    RunStarted { job_id: String },
    RunQueued { job_id: String },
    /// Status 2 in CLI exit-code terms: a job request arrived while the
    /// global run lock was held by another job.
    RunBlocked { held_by_job_id: Option<String> },

    Schedules { schedules: Vec<ScheduleSummary> },
    Schedule { schedule: Option<Box<ScheduleSummary>> },

    Companies { companies: Vec<CompanySummary> },
    Company { company: Option<Box<CompanySummary>> },

    PortalSettings { settings: Box<PortalSettingsDetail> },

    /// The caller's session lacks the permission flag the request required.
    Forbidden { permission: String },
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
