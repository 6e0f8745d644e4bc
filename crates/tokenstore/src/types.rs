// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-(tenant, realm) OAuth2 token record.

use oiat_core::TenantKey;
use serde::{Deserialize, Serialize};

/// The remote accounting service's company identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RealmId(pub String);

impl RealmId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RealmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RealmId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The key under which a `TokenRecord` is stored: (tenant, realm).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub tenant: TenantKey,
    pub realm: RealmId,
}

impl TokenKey {
    pub fn new(tenant: impl Into<TenantKey>, realm: impl Into<RealmId>) -> Self {
        Self {
            tenant: tenant.into(),
            realm: realm.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix epoch milliseconds at which `access_token` stops being valid.
    pub access_expiry_ms: u64,
    /// Unix epoch milliseconds at which `refresh_token` stops being valid,
    /// if the provider reports one.
    pub refresh_expiry_ms: Option<u64>,
    /// Free-form tag distinguishing sandbox/production credential sets,
    /// carried through from `StoreFromOAuth`'s bootstrap call.
    pub environment: String,
}

impl TokenRecord {
    /// A token is valid if `now + 60s < access_expiry`.
    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        now_ms + 60_000 < self.access_expiry_ms
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
