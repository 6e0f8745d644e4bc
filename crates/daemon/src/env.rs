// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

/// `OIAT_REAP_STALE_AFTER_SECONDS`, default 4 hours.
pub fn reap_stale_after() -> Duration {
    std::env::var("OIAT_REAP_STALE_AFTER_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(4 * 60 * 60))
}

/// `OIAT_DISPATCHER_RECONCILE_SECONDS`, default 60.
pub fn dispatcher_reconcile_interval() -> Duration {
    std::env::var("OIAT_DISPATCHER_RECONCILE_SECONDS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(60))
}

/// Path to the orchestrator's own lock file, relative to the state dir.
pub fn lock_file_name() -> &'static str {
    "runtime/global_run.lock"
}

/// Path to the Operator API's unix socket, relative to the state dir.
pub fn socket_file_name() -> &'static str {
    "runtime/oiatd.sock"
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
