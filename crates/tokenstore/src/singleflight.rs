// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key async guards so concurrent `Refresh` calls for the same
//! (tenant, realm) coalesce onto a single network round trip, rather than
//! each racing to rotate the remote provider's refresh token.
//!
//! Grounded on the singleflight-guard-map pattern used by OAuth2 token
//! brokers: a `Mutex` per key, held for the duration of the refresh, so
//! the second and later callers simply wait and then observe whatever the
//! first caller already wrote to the store.

use crate::types::TokenKey;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct GuardMap {
    guards: SyncMutex<HashMap<TokenKey, Arc<AsyncMutex<()>>>>,
}

impl GuardMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the guard for `key`, creating one if this is the first
    /// caller to ask for it. The map entry itself is never removed: the
    /// set of distinct (tenant, realm) pairs is small and bounded by
    /// configuration, so leaking one `Arc<Mutex<()>>` per pair for the
    /// life of the process is cheap compared to the coordination it buys.
    pub fn guard_for(&self, key: &TokenKey) -> Arc<AsyncMutex<()>> {
        let mut guards = self.guards.lock();
        guards
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
#[path = "singleflight_tests.rs"]
mod tests;
