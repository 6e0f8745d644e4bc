// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pipeline orchestrator's state machine value.
//!
//! REDESIGN: phases are modeled as an explicit enum rather than a sequence
//! of linear function calls, so a structured event can be emitted on every
//! transition independent of the control flow that drives it.

use serde::{Deserialize, Serialize};

/// One stage of a single-date pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Download,
    Split,
    Merge,
    Transform,
    Upload,
    Archive,
    Reconcile,
}

impl Phase {
    /// Phases in execution order for a single date.
    pub const ORDER: [Phase; 7] = [
        Phase::Download,
        Phase::Split,
        Phase::Merge,
        Phase::Transform,
        Phase::Upload,
        Phase::Archive,
        Phase::Reconcile,
    ];

    pub fn next(self) -> Option<Phase> {
        let idx = Self::ORDER.iter().position(|p| *p == self)?;
        Self::ORDER.get(idx + 1).copied()
    }
}

crate::simple_display! {
    Phase {
        Download => "download",
        Split => "split",
        Merge => "merge",
        Transform => "transform",
        Upload => "upload",
        Archive => "archive",
        Reconcile => "reconcile",
    }
}

/// Outcome of a completed phase, attached to its [`PhaseRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Success,
    Skipped { reason: String },
    Failed { reason: String },
}

impl PhaseOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PhaseOutcome::Failed { .. })
    }
}

/// Append-only history entry for one phase transition of a run.
///
/// Mirrors the job-step history discipline: once written, a record is
/// never mutated, only appended to `RunJob::phase_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub outcome: PhaseOutcome,
    /// Phase-specific counters (rows in/out, docs created, etc.), kept
    /// loosely typed since each phase reports a different shape.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub counts: serde_json::Map<String, serde_json::Value>,
}

impl PhaseRecord {
    pub fn duration_ms(&self) -> u64 {
        self.finished_at_ms.saturating_sub(self.started_at_ms)
    }
}

#[cfg(test)]
#[path = "phase_tests.rs"]
mod tests;
