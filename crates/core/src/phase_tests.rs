// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn phase_order_is_download_first_reconcile_last() {
    assert_eq!(Phase::ORDER[0], Phase::Download);
    assert_eq!(Phase::ORDER[Phase::ORDER.len() - 1], Phase::Reconcile);
}

#[test]
fn next_walks_the_fixed_sequence() {
    assert_eq!(Phase::Download.next(), Some(Phase::Split));
    assert_eq!(Phase::Upload.next(), Some(Phase::Archive));
    assert_eq!(Phase::Reconcile.next(), None);
}

#[test]
fn phase_display_matches_event_tag_vocabulary() {
    assert_eq!(Phase::Download.to_string(), "download");
    assert_eq!(Phase::Reconcile.to_string(), "reconcile");
}

#[test]
fn failed_outcome_is_a_failure() {
    let outcome = PhaseOutcome::Failed { reason: "boom".into() };
    assert!(outcome.is_failure());
    assert!(!PhaseOutcome::Success.is_failure());
}

#[test]
fn duration_ms_saturates_on_bad_ordering() {
    let rec = PhaseRecord {
        phase: Phase::Split,
        started_at_ms: 100,
        finished_at_ms: 50,
        outcome: PhaseOutcome::Success,
        counts: serde_json::Map::new(),
    };
    assert_eq!(rec.duration_ms(), 0);
}
