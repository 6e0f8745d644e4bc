// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn failure_reason_is_truncated_to_200_chars() {
    let err = PipelineError::Config("x".repeat(500));
    assert!(err.failure_reason().chars().count() <= 200);
}

#[test]
fn remote_validation_is_not_fatal_to_run() {
    let err = PipelineError::RemoteValidation {
        code: "400".into(),
        message: "bad line item".into(),
    };
    assert!(!err.is_fatal_to_run());
}

#[test]
fn archive_error_is_not_fatal_to_run() {
    let err = PipelineError::ArchiveError("disk full".into());
    assert!(!err.is_fatal_to_run());
}

#[test]
fn lock_held_is_fatal_to_run() {
    assert!(PipelineError::LockHeld.is_fatal_to_run());
}

#[test]
fn kind_maps_lock_held() {
    assert_eq!(PipelineError::LockHeld.kind(), ErrorKind::LockHeld);
}
