// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn error_roundtrips_through_json() {
    let resp = Response::Error {
        message: "blocked by existing lock".to_string(),
    };
    let encoded = serde_json::to_string(&resp).expect("encode");
    let decoded: Response = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(resp, decoded);
}

#[test]
fn run_blocked_carries_optional_holder() {
    let resp = Response::RunBlocked {
        held_by_job_id: Some("rjob_9".to_string()),
    };
    let encoded = serde_json::to_string(&resp).expect("encode");
    let decoded: Response = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(resp, decoded);
}

#[test]
fn forbidden_names_the_missing_permission() {
    let resp = Response::Forbidden {
        permission: "can_trigger_runs".to_string(),
    };
    let encoded = serde_json::to_string(&resp).expect("encode");
    let decoded: Response = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(resp, decoded);
}
