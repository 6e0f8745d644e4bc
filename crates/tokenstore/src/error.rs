// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("no token on file for tenant {tenant}, realm {realm}")]
    NotFound { tenant: String, realm: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed token row: {0}")]
    Json(#[from] serde_json::Error),

    #[error("refresh grant rejected by provider: {0}")]
    InvalidGrant(String),

    #[error("network error talking to the token endpoint: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider returned an unexpected response: {0}")]
    ProviderResponse(String),

    #[error("exhausted retry budget refreshing token for {tenant}/{realm}: {source}")]
    RetriesExhausted {
        tenant: String,
        realm: String,
        #[source]
        source: Box<TokenStoreError>,
    },
}

impl TokenStoreError {
    /// `InvalidGrant` means the refresh token itself is dead; the stored
    /// record must be purged rather than retried.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, TokenStoreError::InvalidGrant(_))
    }
}

impl From<TokenStoreError> for oiat_core::PipelineError {
    fn from(e: TokenStoreError) -> Self {
        match e {
            TokenStoreError::InvalidGrant(msg) | TokenStoreError::ProviderResponse(msg) => {
                oiat_core::PipelineError::TokenRefreshFailed(msg)
            }
            TokenStoreError::Network(e) => {
                oiat_core::PipelineError::TokenRefreshFailed(e.to_string())
            }
            TokenStoreError::RetriesExhausted { source, .. } => (*source).into(),
            other => oiat_core::PipelineError::TokenRefreshFailed(other.to_string()),
        }
    }
}
