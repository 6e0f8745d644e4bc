// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn delay_grows_exponentially_with_no_jitter() {
    assert_eq!(delay_for_attempt(0, 0.0), Duration::from_millis(500));
    assert_eq!(delay_for_attempt(1, 0.0), Duration::from_millis(1000));
    assert_eq!(delay_for_attempt(2, 0.0), Duration::from_millis(2000));
}

#[test]
fn jitter_stays_within_twenty_percent_bounds() {
    let base = delay_for_attempt(1, 0.0).as_millis() as f64;
    let high = delay_for_attempt(1, 1.0).as_millis() as f64;
    let low = delay_for_attempt(1, -1.0).as_millis() as f64;
    assert!((high - base - base * 0.2).abs() < 1.0);
    assert!((base - low - base * 0.2).abs() < 1.0);
}

#[test]
fn jitter_unit_outside_range_is_clamped() {
    assert_eq!(delay_for_attempt(0, 5.0), delay_for_attempt(0, 1.0));
    assert_eq!(delay_for_attempt(0, -5.0), delay_for_attempt(0, -1.0));
}

#[tokio::test]
async fn succeeds_without_retry_on_first_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = calls.clone();
    let result: Result<u32, &'static str> = retry_with_backoff(
        move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            }
        },
        |_: &&'static str| true,
        |_| async {},
        || 0.0,
    )
    .await;
    assert_eq!(result, Ok(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_up_to_max_attempts_then_gives_up() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = calls.clone();
    let result: Result<u32, &'static str> = retry_with_backoff(
        move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("transient")
            }
        },
        |_: &&'static str| true,
        |_| async {},
        || 0.0,
    )
    .await;
    assert_eq!(result, Err("transient"));
    assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
}

#[tokio::test]
async fn non_retriable_error_stops_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls2 = calls.clone();
    let result: Result<u32, &'static str> = retry_with_backoff(
        move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal")
            }
        },
        |_: &&'static str| false,
        |_| async {},
        || 0.0,
    )
    .await;
    assert_eq!(result, Err("fatal"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
