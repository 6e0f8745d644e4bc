// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The opaque surface of the remote accounting service that the Upload
//! Engine depends on. Real requests go through
//! [`HttpRemoteClient`]; tests substitute [`fake::FakeRemoteClient`],
//! matching the adapter/fake-adapter split used throughout this workspace.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One candidate for the existence query.
/// `expected_transaction_date` is populated only in trading-day mode, where
/// a doc number can legitimately be reused across trading days and the
/// remote match must be narrowed to the specific day expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocNumberQuery {
    pub doc_number: String,
    pub expected_transaction_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub doc_number: String,
    pub transaction_date: NaiveDate,
    pub lines: Vec<DocumentLine>,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLine {
    pub item_name: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteItem {
    pub name: String,
    pub item_type: ItemType,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    /// `None` means the item has no inventory-start-date restriction.
    pub inventory_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub accounts: Option<AccountTriple>,
}

/// The asset/income/COGS account an inventory item posts against, resolved
/// from the tenant's category → account mapping CSV at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTriple {
    pub asset_account: String,
    pub income_account: String,
    pub cogs_account: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Inventory,
    Service,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub item_type: ItemType,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    #[serde(default)]
    pub accounts: Option<AccountTriple>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: String,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
}

/// Whether remote rejected a document outright, or accepted it with
/// warnings.
#[derive(Debug, Clone)]
pub enum CreateDocumentOutcome {
    Created { remote_id: String },
    RejectedInventory { message: String },
    Warned { remote_id: String, warnings: Vec<String> },
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("remote validation failed: [{code}] {message}")]
    Validation { code: String, message: String },
}

#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn query_existing_doc_numbers(
        &self,
        bearer_token: &str,
        candidates: &[DocNumberQuery],
    ) -> Result<Vec<String>, RemoteError>;

    async fn query_items(
        &self,
        bearer_token: &str,
        names: &[String],
    ) -> Result<Vec<RemoteItem>, RemoteError>;

    async fn create_item(
        &self,
        bearer_token: &str,
        item: NewItem,
    ) -> Result<RemoteItem, RemoteError>;

    async fn patch_item(&self, bearer_token: &str, patch: ItemPatch) -> Result<(), RemoteError>;

    async fn create_document(
        &self,
        bearer_token: &str,
        document: &DocumentPayload,
    ) -> Result<CreateDocumentOutcome, RemoteError>;

    /// Sum of document totals remote reports for `date`, used by
    /// reconciliation.
    async fn remote_total_for_date(
        &self,
        bearer_token: &str,
        date: NaiveDate,
    ) -> Result<i64, RemoteError>;
}

#[derive(Clone)]
pub struct HttpRemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRemoteClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_error(status: reqwest::StatusCode) -> Option<RemoteError> {
        (status == reqwest::StatusCode::UNAUTHORIZED).then_some(RemoteError::Unauthorized)
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn query_existing_doc_numbers(
        &self,
        bearer_token: &str,
        candidates: &[DocNumberQuery],
    ) -> Result<Vec<String>, RemoteError> {
        let response = self
            .http
            .post(self.url("/documents/query"))
            .bearer_auth(bearer_token)
            .json(&serde_json::json!({ "candidates": candidates }))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if let Some(err) = Self::auth_error(response.status()) {
            return Err(err);
        }
        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))
    }

    async fn query_items(
        &self,
        bearer_token: &str,
        names: &[String],
    ) -> Result<Vec<RemoteItem>, RemoteError> {
        let response = self
            .http
            .post(self.url("/items/query"))
            .bearer_auth(bearer_token)
            .json(&serde_json::json!({ "names": names }))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if let Some(err) = Self::auth_error(response.status()) {
            return Err(err);
        }
        response
            .json::<Vec<RemoteItem>>()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))
    }

    async fn create_item(
        &self,
        bearer_token: &str,
        item: NewItem,
    ) -> Result<RemoteItem, RemoteError> {
        let response = self
            .http
            .post(self.url("/items"))
            .bearer_auth(bearer_token)
            .json(&item)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if let Some(err) = Self::auth_error(response.status()) {
            return Err(err);
        }
        response
            .json::<RemoteItem>()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))
    }

    async fn patch_item(&self, bearer_token: &str, patch: ItemPatch) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url(&format!("/items/{}/patch", patch.name)))
            .bearer_auth(bearer_token)
            .json(&patch)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if let Some(err) = Self::auth_error(response.status()) {
            return Err(err);
        }
        Ok(())
    }

    async fn create_document(
        &self,
        bearer_token: &str,
        document: &DocumentPayload,
    ) -> Result<CreateDocumentOutcome, RemoteError> {
        let response = self
            .http
            .post(self.url("/documents"))
            .bearer_auth(bearer_token)
            .json(document)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if let Some(err) = Self::auth_error(response.status()) {
            return Err(err);
        }
        let status = response.status();
        let body: CreateDocumentResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(RemoteError::Validation {
                code: body.code.unwrap_or_default(),
                message: body.message.unwrap_or_default(),
            });
        }
        match body.status.as_str() {
            "rejected_inventory" => Ok(CreateDocumentOutcome::RejectedInventory {
                message: body.message.unwrap_or_default(),
            }),
            "warned" => Ok(CreateDocumentOutcome::Warned {
                remote_id: body.remote_id.unwrap_or_else(|| document.doc_number.clone()),
                warnings: body.warnings,
            }),
            _ => Ok(CreateDocumentOutcome::Created {
                remote_id: body.remote_id.unwrap_or_else(|| document.doc_number.clone()),
            }),
        }
    }

    async fn remote_total_for_date(
        &self,
        bearer_token: &str,
        date: NaiveDate,
    ) -> Result<i64, RemoteError> {
        let response = self
            .http
            .get(self.url("/documents/total"))
            .bearer_auth(bearer_token)
            .query(&[("date", date.to_string())])
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if let Some(err) = Self::auth_error(response.status()) {
            return Err(err);
        }
        let body: TotalResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(body.total_cents)
    }
}

#[derive(Debug, Deserialize)]
struct CreateDocumentResponse {
    #[serde(default = "default_created_status")]
    status: String,
    #[serde(default)]
    remote_id: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn default_created_status() -> String {
    "created".to_string()
}

#[derive(Debug, Deserialize)]
struct TotalResponse {
    total_cents: i64,
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        accepted_docs: HashMap<String, DocumentPayload>,
        items: HashMap<String, RemoteItem>,
        create_calls: usize,
        unauthorized_until_refresh: bool,
    }

    /// In-memory stand-in for the remote accounting service, used across
    /// Upload Engine tests. `force_one_unauthorized` reproduces the
    /// "token expiring mid-upload" boundary behavior.
    #[derive(Clone, Default)]
    pub struct FakeRemoteClient {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeRemoteClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed_item(&self, item: RemoteItem) {
            self.state.lock().items.insert(item.name.clone(), item);
        }

        pub fn seed_accepted(&self, doc: DocumentPayload) {
            self.state
                .lock()
                .accepted_docs
                .insert(doc.doc_number.clone(), doc);
        }

        pub fn force_one_unauthorized(&self) {
            self.state.lock().unauthorized_until_refresh = true;
        }

        pub fn accepted_doc_numbers(&self) -> Vec<String> {
            let mut v: Vec<String> = self.state.lock().accepted_docs.keys().cloned().collect();
            v.sort();
            v
        }

        pub fn create_call_count(&self) -> usize {
            self.state.lock().create_calls
        }

        pub fn seeded_item(&self, name: &str) -> Option<RemoteItem> {
            self.state.lock().items.get(name).cloned()
        }
    }

    #[async_trait]
    impl RemoteClient for FakeRemoteClient {
        async fn query_existing_doc_numbers(
            &self,
            _bearer_token: &str,
            candidates: &[DocNumberQuery],
        ) -> Result<Vec<String>, RemoteError> {
            let state = self.state.lock();
            Ok(candidates
                .iter()
                .filter(|c| match (&c.expected_transaction_date, state.accepted_docs.get(&c.doc_number)) {
                    (Some(expected), Some(doc)) => doc.transaction_date == *expected,
                    (None, Some(_)) => true,
                    (_, None) => false,
                })
                .map(|c| c.doc_number.clone())
                .collect())
        }

        async fn query_items(
            &self,
            _bearer_token: &str,
            names: &[String],
        ) -> Result<Vec<RemoteItem>, RemoteError> {
            let state = self.state.lock();
            Ok(names
                .iter()
                .filter_map(|n| state.items.get(n).cloned())
                .collect())
        }

        async fn create_item(
            &self,
            _bearer_token: &str,
            item: NewItem,
        ) -> Result<RemoteItem, RemoteError> {
            let created = RemoteItem {
                name: item.name.clone(),
                item_type: item.item_type,
                price_cents: item.price_cents,
                cost_cents: item.cost_cents,
                inventory_start_date: None,
                accounts: item.accounts.clone(),
            };
            self.state
                .lock()
                .items
                .insert(item.name, created.clone());
            Ok(created)
        }

        async fn patch_item(
            &self,
            _bearer_token: &str,
            patch: ItemPatch,
        ) -> Result<(), RemoteError> {
            let mut state = self.state.lock();
            if let Some(existing) = state.items.get_mut(&patch.name) {
                if patch.price_cents.is_some() {
                    existing.price_cents = patch.price_cents;
                }
                if patch.cost_cents.is_some() {
                    existing.cost_cents = patch.cost_cents;
                }
            }
            Ok(())
        }

        async fn create_document(
            &self,
            _bearer_token: &str,
            document: &DocumentPayload,
        ) -> Result<CreateDocumentOutcome, RemoteError> {
            let mut state = self.state.lock();
            if state.unauthorized_until_refresh {
                state.unauthorized_until_refresh = false;
                return Err(RemoteError::Unauthorized);
            }
            state.create_calls += 1;
            state
                .accepted_docs
                .insert(document.doc_number.clone(), document.clone());
            Ok(CreateDocumentOutcome::Created {
                remote_id: document.doc_number.clone(),
            })
        }

        async fn remote_total_for_date(
            &self,
            _bearer_token: &str,
            date: NaiveDate,
        ) -> Result<i64, RemoteError> {
            let state = self.state.lock();
            Ok(state
                .accepted_docs
                .values()
                .filter(|d| d.transaction_date == date)
                .map(|d| d.total_cents)
                .sum())
        }
    }
}
