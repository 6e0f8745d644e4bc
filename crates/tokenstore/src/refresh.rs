// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The OAuth2 refresh-token grant call itself, isolated behind
//! [`RefreshClient`] so the rest of the crate (and its tests) deal only
//! in [`crate::types::TokenRecord`] rather than `oauth2` crate internals.

use crate::error::TokenStoreError;
use crate::types::TokenRecord;
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, AuthorizationCode, ClientId, ClientSecret, RedirectUrl, RefreshToken, TokenResponse, TokenUrl};

/// Credentials and endpoint needed to perform a refresh-token grant
/// against one tenant's configured accounting-service connected app.
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct RefreshClient {
    http: reqwest::Client,
}

impl RefreshClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Exchanges a freshly obtained authorization code for the first
    /// access/refresh token pair, used by `oiat token bootstrap` once an operator has
    /// completed the provider's consent screen out of band.
    pub async fn exchange_code(
        &self,
        endpoint: &ProviderEndpoint,
        authorization_code: &str,
        redirect_uri: &str,
        now_ms: u64,
    ) -> Result<TokenRecord, TokenStoreError> {
        let client = BasicClient::new(
            ClientId::new(endpoint.client_id.clone()),
            Some(ClientSecret::new(endpoint.client_secret.clone())),
            AuthUrl::new(endpoint.token_url.clone())
                .map_err(|e| TokenStoreError::ProviderResponse(e.to_string()))?,
            Some(
                TokenUrl::new(endpoint.token_url.clone())
                    .map_err(|e| TokenStoreError::ProviderResponse(e.to_string()))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(redirect_uri.to_string())
                .map_err(|e| TokenStoreError::ProviderResponse(e.to_string()))?,
        );

        let http = self.http.clone();
        let response = client
            .exchange_code(AuthorizationCode::new(authorization_code.to_string()))
            .request_async(move |request| {
                let http = http.clone();
                async move { execute(&http, request).await }
            })
            .await
            .map_err(map_request_error)?;

        let access_token = response.access_token().secret().clone();
        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().clone())
            .ok_or_else(|| TokenStoreError::ProviderResponse("provider did not return a refresh token".to_string()))?;
        let expires_in_ms = response
            .expires_in()
            .map(|d| d.as_millis() as u64)
            .unwrap_or(3600 * 1000);

        Ok(TokenRecord {
            access_token,
            refresh_token,
            access_expiry_ms: now_ms + expires_in_ms,
            refresh_expiry_ms: None,
            environment: String::new(),
        })
    }

    /// Performs a single `grant_type=refresh_token` call. Does not retry;
    /// callers wrap this with [`crate::retry::retry_with_backoff`].
    pub async fn refresh(
        &self,
        endpoint: &ProviderEndpoint,
        refresh_token: &str,
        now_ms: u64,
    ) -> Result<TokenRecord, TokenStoreError> {
        let client = BasicClient::new(
            ClientId::new(endpoint.client_id.clone()),
            Some(ClientSecret::new(endpoint.client_secret.clone())),
            AuthUrl::new(endpoint.token_url.clone())
                .map_err(|e| TokenStoreError::ProviderResponse(e.to_string()))?,
            Some(
                TokenUrl::new(endpoint.token_url.clone())
                    .map_err(|e| TokenStoreError::ProviderResponse(e.to_string()))?,
            ),
        );

        let http = self.http.clone();
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(move |request| {
                let http = http.clone();
                async move { execute(&http, request).await }
            })
            .await
            .map_err(map_request_error)?;

        let access_token = response.access_token().secret().clone();
        let new_refresh_token = response
            .refresh_token()
            .map(|t| t.secret().clone())
            .unwrap_or_else(|| refresh_token.to_string());
        let expires_in_ms = response
            .expires_in()
            .map(|d| d.as_millis() as u64)
            .unwrap_or(3600 * 1000);

        Ok(TokenRecord {
            access_token,
            refresh_token: new_refresh_token,
            access_expiry_ms: now_ms + expires_in_ms,
            refresh_expiry_ms: None,
            environment: String::new(),
        })
    }
}

async fn execute(
    http: &reqwest::Client,
    request: oauth2::HttpRequest,
) -> Result<oauth2::HttpResponse, reqwest::Error> {
    let mut builder = http.request(request.method, request.url.as_str());
    for (name, value) in request.headers.iter() {
        builder = builder.header(name.clone(), value.clone());
    }
    let response = builder.body(request.body).send().await?;
    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(oauth2::HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn map_request_error<E>(
    err: oauth2::RequestTokenError<E, oauth2::basic::BasicErrorResponse>,
) -> TokenStoreError
where
    E: std::error::Error + 'static,
{
    use oauth2::RequestTokenError;
    match err {
        RequestTokenError::ServerResponse(resp) => {
            use oauth2::ErrorResponse;
            match resp.error() {
                oauth2::basic::BasicErrorResponseType::InvalidGrant => {
                    TokenStoreError::InvalidGrant(
                        resp.error_description()
                            .cloned()
                            .unwrap_or_else(|| "invalid_grant".to_string()),
                    )
                }
                _ => TokenStoreError::ProviderResponse(format!("{:?}", resp.error())),
            }
        }
        other => TokenStoreError::ProviderResponse(other.to_string()),
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
