// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Token Store component: `Load`, `LoadBatch`, `Save`,
//! `Refresh`, and `StoreFromOAuth`, with concurrent refreshes for the same
//! key coalesced through a per-key async guard.

use crate::db::TokenDb;
use crate::error::TokenStoreError;
use crate::refresh::{ProviderEndpoint, RefreshClient};
use crate::retry;
use crate::singleflight::GuardMap;
use crate::types::{TokenKey, TokenRecord};
use oiat_core::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct TokenStore<C: Clock> {
    db: TokenDb,
    guards: GuardMap,
    refresh_client: RefreshClient,
    clock: C,
}

impl<C: Clock> TokenStore<C> {
    pub fn new(db: TokenDb, refresh_client: RefreshClient, clock: C) -> Self {
        Self {
            db,
            guards: GuardMap::new(),
            refresh_client,
            clock,
        }
    }

    pub fn load(&self, key: &TokenKey) -> Result<TokenRecord, TokenStoreError> {
        self.db
            .load(key)?
            .ok_or_else(|| TokenStoreError::NotFound {
                tenant: key.tenant.to_string(),
                realm: key.realm.to_string(),
            })
    }

    pub fn load_batch(
        &self,
        keys: &[TokenKey],
    ) -> Result<HashMap<TokenKey, TokenRecord>, TokenStoreError> {
        self.db.load_batch(keys)
    }

    pub fn save(&self, key: &TokenKey, record: &TokenRecord) -> Result<(), TokenStoreError> {
        self.db.save(key, record, self.clock.epoch_ms())
    }

    /// Bootstraps a record from a freshly completed OAuth2 authorization
    /// code exchange.
    pub fn store_from_oauth(
        &self,
        key: &TokenKey,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: u64,
        environment: impl Into<String>,
    ) -> Result<TokenRecord, TokenStoreError> {
        let now_ms = self.clock.epoch_ms();
        let record = TokenRecord {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            access_expiry_ms: now_ms + expires_in_secs * 1000,
            refresh_expiry_ms: None,
            environment: environment.into(),
        };
        self.save(key, &record)?;
        Ok(record)
    }

    /// Returns a record known to be valid `now + 60s`, refreshing first if
    /// necessary. Concurrent calls for the same key coalesce onto one
    /// network refresh.
    pub async fn refresh_if_needed(
        &self,
        key: &TokenKey,
        endpoint: &ProviderEndpoint,
    ) -> Result<TokenRecord, TokenStoreError> {
        let guard = self.guards.guard_for(key);
        let _held = guard.lock().await;

        let current = self.load(key)?;
        let now_ms = self.clock.epoch_ms();
        if current.is_valid_at(now_ms) {
            return Ok(current);
        }

        self.refresh_locked(key, endpoint).await
    }

    /// Unconditionally performs a refresh-token grant and persists the
    /// result, retrying transient failures per the configured backoff
    /// policy. An `invalid_grant` response purges the stored record so a
    /// stale refresh token is never retried indefinitely. Coalesces with
    /// any other concurrent `refresh`/`refresh_if_needed` call for the
    /// same key onto a single network round trip.
    pub async fn refresh(
        &self,
        key: &TokenKey,
        endpoint: &ProviderEndpoint,
    ) -> Result<TokenRecord, TokenStoreError> {
        let guard = self.guards.guard_for(key);
        let _held = guard.lock().await;
        self.refresh_locked(key, endpoint).await
    }

    /// Does the actual refresh-token grant. Callers must hold this key's
    /// singleflight guard before calling.
    async fn refresh_locked(
        &self,
        key: &TokenKey,
        endpoint: &ProviderEndpoint,
    ) -> Result<TokenRecord, TokenStoreError> {
        let current = self.load(key)?;
        let clock = &self.clock;
        let refresh_client = &self.refresh_client;

        let result = retry::retry_with_backoff(
            || async {
                refresh_client
                    .refresh(endpoint, &current.refresh_token, clock.epoch_ms())
                    .await
            },
            |err| !matches!(err, TokenStoreError::InvalidGrant(_)),
            |d| tokio::time::sleep(d),
            rand_unit,
        )
        .await;

        match result {
            Ok(mut record) => {
                record.environment = current.environment.clone();
                self.save(key, &record)?;
                info!(tenant = %key.tenant, realm = %key.realm, "refreshed access token");
                Ok(record)
            }
            Err(err) if err.is_invalid_grant() => {
                warn!(tenant = %key.tenant, realm = %key.realm, "refresh token revoked, purging stored record");
                let _ = self.db.delete(key);
                Err(err)
            }
            Err(err) => Err(TokenStoreError::RetriesExhausted {
                tenant: key.tenant.to_string(),
                realm: key.realm.to_string(),
                source: Box::new(err),
            }),
        }
    }
}

fn rand_unit() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / u32::MAX as f64) * 2.0 - 1.0
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
