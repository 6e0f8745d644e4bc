// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newtype identifiers for run-level entities.

use crate::define_id;

define_id! {
    /// Identifies a single pipeline run request.
    pub struct RunJobId("rjob");
}

define_id! {
    /// Identifies the artifact produced by a completed run.
    pub struct RunArtifactId("rart");
}

define_id! {
    /// Identifies a persisted cron schedule.
    pub struct RunScheduleId("rsch");
}

/// A stable tenant identifier, e.g. `"acme-downtown"`.
///
/// Unlike [`crate::id::IdBuf`]-backed IDs, tenant keys are operator-chosen
/// and not bounded to 23 bytes, so they are a thin `smol_str` wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TenantKey(pub smol_str::SmolStr);

impl TenantKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(smol_str::SmolStr::new(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for TenantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TenantKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::borrow::Borrow<str> for TenantKey {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// Tenant scope of a run request: a single tenant, or every configured tenant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantScope {
    One(TenantKey),
    All,
}

impl TenantScope {
    pub fn matches(&self, tenant: &TenantKey) -> bool {
        match self {
            TenantScope::One(t) => t == tenant,
            TenantScope::All => true,
        }
    }
}

impl std::fmt::Display for TenantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TenantScope::One(t) => write!(f, "{t}"),
            TenantScope::All => write!(f, "all"),
        }
    }
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
