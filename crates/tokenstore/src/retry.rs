// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff for the refresh-token grant call.
//!
//! Delay computation is pure and takes its jitter input as a parameter so
//! tests can assert exact bounds without depending on the process RNG, and
//! so the caller can drive it with a deterministic source in tests.

use std::time::Duration;

pub const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 500;
const FACTOR: u64 = 2;
const JITTER_FRACTION: f64 = 0.2;

/// `attempt` is zero-based: the delay to wait *before* the `attempt`'th
/// retry (i.e. `delay_for_attempt(0)` is the delay before the first
/// retry, following the initial attempt that failed).
///
/// `jitter_unit` must be in `[-1.0, 1.0]`; it scales the `+/- 20%` jitter
/// window around the base exponential delay.
pub fn delay_for_attempt(attempt: u32, jitter_unit: f64) -> Duration {
    let jitter_unit = jitter_unit.clamp(-1.0, 1.0);
    let base = BASE_DELAY_MS * FACTOR.pow(attempt);
    let jitter = (base as f64) * JITTER_FRACTION * jitter_unit;
    let millis = (base as f64 + jitter).max(0.0).round() as u64;
    Duration::from_millis(millis)
}

/// Runs `op`, retrying up to [`MAX_ATTEMPTS`] total attempts while `op`'s
/// error satisfies `is_retriable`. `sleep` is injected so tests can run
/// under `tokio::time::pause()` without real wall-clock delay, and
/// `jitter_source` supplies the jitter unit for each retry.
pub async fn retry_with_backoff<T, E, Fut, F, S, SFut, J>(
    mut op: F,
    is_retriable: impl Fn(&E) -> bool,
    mut sleep: S,
    mut jitter_source: J,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    S: FnMut(Duration) -> SFut,
    SFut: std::future::Future<Output = ()>,
    J: FnMut() -> f64,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt + 1 >= MAX_ATTEMPTS || !is_retriable(&err) {
                    return Err(err);
                }
                sleep(delay_for_attempt(attempt, jitter_source())).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
