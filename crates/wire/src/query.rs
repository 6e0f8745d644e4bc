// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query types for reading daemon state (read-only half of the protocol).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Query {
    ListRuns {
        #[serde(default)]
        tenant: Option<String>,
    },
    GetRun {
        id: String,
    },
    GetRunLogs {
        id: String,
        /// Byte offset for incremental polling (0 = start of file).
        #[serde(default)]
        offset: u64,
    },
    ListSchedules,
    GetSchedule {
        id: String,
    },
    ListCompanies,
    GetCompany {
        tenant_key: String,
    },
    GetPortalSettings,
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
