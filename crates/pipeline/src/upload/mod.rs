// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Upload Engine: reads a normalized CSV, groups rows
//! into documents, resolves inventory items, de-duplicates against the
//! ledger and the remote service, uploads, handles token refresh, and
//! computes reconciliation totals.

pub mod client;

use crate::error::UploadError;
use chrono::NaiveDate;
use client::{
    AccountTriple, CreateDocumentOutcome, DocNumberQuery, DocumentLine, DocumentPayload,
    ItemPatch, ItemType, NewItem, RemoteClient, RemoteError, RemoteItem,
};
use oiat_config::types::InventorySyncMode as ConfigInventorySyncMode;
use oiat_config::{CompanyConfig, GroupingStrategy};
use oiat_storage::Ledger;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// One row of the transformer's output CSV. Column mapping (raw row to
/// this shape) is out of scope; this is the fixed contract
/// between `oiat-pipeline::transform` and the Upload Engine.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizedRow {
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub location: Option<String>,
    pub tender: String,
    pub item_name: String,
    #[serde(default)]
    pub item_category: Option<String>,
    pub quantity: f64,
    pub unit_price_cents: i64,
}

impl NormalizedRow {
    fn line_total_cents(&self) -> i64 {
        (self.quantity * self.unit_price_cents as f64).round() as i64
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadResult {
    pub attempted: u64,
    pub skipped_dup: u64,
    pub created: u64,
    pub failed: u64,
    pub created_doc_numbers: Vec<String>,
    pub source_total_cents: i64,
    pub remote_total_cents: i64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub inventory_sync_mode_override: Option<ConfigInventorySyncMode>,
    pub bypass_inventory_startdate_override: Option<bool>,
    pub dry_run: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            inventory_sync_mode_override: None,
            bypass_inventory_startdate_override: None,
            dry_run: false,
        }
    }
}

const PRICE_DRIFT_THRESHOLD_CENTS: i64 = 1;
const MAX_CONCURRENT_READS: usize = 4;

struct DocumentGroup {
    doc_number: String,
    transaction_date: NaiveDate,
    rows: Vec<NormalizedRow>,
}

/// Deterministically groups normalized rows into documents per the
/// tenant's configured grouping strategy, assigning a stable sequence
/// number in sorted-group-key order.
fn group_documents(rows: &[NormalizedRow], config: &CompanyConfig) -> Vec<DocumentGroup> {
    let mut groups: BTreeMap<(NaiveDate, String, String), Vec<NormalizedRow>> = BTreeMap::new();
    for row in rows {
        let location = match config.grouping_strategy {
            GroupingStrategy::DateTender => String::new(),
            GroupingStrategy::DateLocationTender => row.location.clone().unwrap_or_default(),
        };
        groups
            .entry((row.transaction_date, location, row.tender.clone()))
            .or_default()
            .push(row.clone());
    }

    let mut by_date: HashMap<NaiveDate, u32> = HashMap::new();
    groups
        .into_iter()
        .map(|((date, location, _tender), rows)| {
            let seq = by_date.entry(date).or_insert(0);
            *seq += 1;
            let date_str = date.format(&config.date_format).to_string();
            let doc_number = if location.is_empty() {
                format!("{}-{}-{:04}", config.receipt_prefix, date_str, seq)
            } else {
                format!(
                    "{}-{}-{}-{:04}",
                    config.receipt_prefix, date_str, location, seq
                )
            };
            DocumentGroup {
                doc_number,
                transaction_date: date,
                rows,
            }
        })
        .collect()
}

fn document_payload(group: &DocumentGroup) -> DocumentPayload {
    let lines: Vec<DocumentLine> = group
        .rows
        .iter()
        .map(|r| DocumentLine {
            item_name: r.item_name.clone(),
            quantity: r.quantity,
            unit_price_cents: r.unit_price_cents,
            description: None,
        })
        .collect();
    let total_cents = group.rows.iter().map(|r| r.line_total_cents()).sum();
    DocumentPayload {
        doc_number: group.doc_number.clone(),
        transaction_date: group.transaction_date,
        lines,
        total_cents,
    }
}

/// Obtains a fresh bearer token on the run's single permitted 401-triggered
/// refresh. Implemented by `oiat-tokenstore::TokenStore`
/// at the call site that wires the Upload Engine to a real token store;
/// tests use a fake that returns a fixed string or an injected failure.
#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, UploadError>;
}

pub struct UploadEngine<C: RemoteClient> {
    client: C,
}

impl<C: RemoteClient> UploadEngine<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Runs the full upload contract for one (tenant, date-or-range)'s
    /// already-transformed CSV. `bearer_token` is obtained once by the
    /// caller; `refresh` is invoked at most once, on the
    /// first 401 across the whole run; a second 401 after
    /// that refresh, anywhere in the run, is fatal.
    pub async fn upload(
        &self,
        normalized_rows: Vec<NormalizedRow>,
        config: &CompanyConfig,
        ledger: &mut Ledger,
        mut bearer_token: String,
        options: &UploadOptions,
        refresher: &dyn TokenRefresher,
    ) -> Result<UploadResult, UploadError> {
        let source_total_cents: i64 = normalized_rows.iter().map(|r| r.line_total_cents()).sum();
        let groups = group_documents(&normalized_rows, config);

        let reads = Semaphore::new(MAX_CONCURRENT_READS);
        let mut result = UploadResult {
            source_total_cents,
            ..Default::default()
        };

        result.attempted = groups.len() as u64;
        if groups.is_empty() {
            result.remote_total_cents = self.reconcile_total(config, &mut bearer_token, &normalized_rows).await?;
            return Ok(result);
        }

        // Every group in this run is queried against remote truth, whether
        // or not the ledger already claims it: a ledger entry that does not
        // correspond to a remote document must be detected and healed, not
        // trusted as a dedup short-circuit.
        let trading_day_mode = config.trading_day_cutoff.is_some();
        let candidate_queries: Vec<DocNumberQuery> = groups
            .iter()
            .map(|g| DocNumberQuery {
                doc_number: g.doc_number.clone(),
                expected_transaction_date: trading_day_mode.then_some(g.transaction_date),
            })
            .collect();
        let existing_remote = {
            let _permit = reads.acquire().await.expect("semaphore not closed");
            self.client
                .query_existing_doc_numbers(&bearer_token, &candidate_queries)
                .await
                .map_err(|e| UploadError::Network(e.to_string()))?
        };
        let existing_remote: HashSet<String> = existing_remote.into_iter().collect();

        // Heal ledger entries this run touched that remote did not confirm,
        // without disturbing entries for documents outside this run's scope
        // (those were never queried, so they must not be treated as stale).
        let candidate_set: HashSet<String> = groups.iter().map(|g| g.doc_number.clone()).collect();
        let mut found_in_remote_for_heal = existing_remote.clone();
        for doc in ledger.snapshot() {
            if !candidate_set.contains(&doc) {
                found_in_remote_for_heal.insert(doc);
            }
        }
        let healed = ledger.heal_stale(&found_in_remote_for_heal)?;
        for doc in &healed {
            warn!(doc_number = %doc, "stale ledger entry healed: absent remotely, will be recreated");
        }

        let mut to_create = Vec::new();
        for group in &groups {
            if existing_remote.contains(&group.doc_number) {
                if !ledger.contains(&group.doc_number) {
                    warn!(doc_number = %group.doc_number, "stale ledger entry healed: exists remotely but was missing locally");
                    ledger.add(&group.doc_number)?;
                }
                result.skipped_dup += 1;
            } else {
                to_create.push(group);
            }
        }

        let item_map = if config.inventory.enabled && !to_create.is_empty() {
            self.resolve_inventory(&to_create, config, &mut bearer_token, &reads)
                .await?
        } else {
            HashMap::new()
        };

        let mut refreshed_once = false;
        for group in to_create {
            if options.dry_run {
                result.created += 1;
                result.created_doc_numbers.push(group.doc_number.clone());
                continue;
            }
            let mut payload = document_payload(group);
            if config.inventory.enabled
                && options
                    .bypass_inventory_startdate_override
                    .unwrap_or(config.inventory.bypass_inventory_startdate)
            {
                apply_backdated_bypass(&mut payload, &item_map, config);
            }

            match self
                .create_document_with_retry(
                    &payload,
                    &mut bearer_token,
                    refresher,
                    &mut refreshed_once,
                )
                .await
            {
                Ok(outcome) => match self.apply_create_outcome(outcome, config) {
                    Ok(warnings) => {
                        result.warnings.extend(warnings);
                        result.created += 1;
                        result.created_doc_numbers.push(group.doc_number.clone());
                        ledger.add(&group.doc_number)?;
                    }
                    Err(_) => {
                        result.failed += 1;
                    }
                },
                Err(UploadError::Token(_)) => {
                    return Err(UploadError::Token(
                        "second consecutive 401 from remote service".to_string(),
                    ));
                }
                Err(_) => {
                    result.failed += 1;
                }
            }
        }

        result.remote_total_cents = self
            .reconcile_total(config, &mut bearer_token, &normalized_rows)
            .await?;
        Ok(result)
    }

    async fn reconcile_total(
        &self,
        config: &CompanyConfig,
        bearer_token: &mut String,
        normalized_rows: &[NormalizedRow],
    ) -> Result<i64, UploadError> {
        let date = match normalized_rows.first() {
            Some(r) => r.transaction_date,
            None => return Ok(0),
        };
        let _ = config;
        self.client
            .remote_total_for_date(bearer_token, date)
            .await
            .map_err(|e| UploadError::Network(e.to_string()))
    }

    async fn resolve_inventory(
        &self,
        groups: &[&DocumentGroup],
        config: &CompanyConfig,
        bearer_token: &mut String,
        reads: &Semaphore,
    ) -> Result<HashMap<String, RemoteItem>, UploadError> {
        // The first row naming an item sets the price (and category) this
        // run observed for it; this is what inline sync drifts against.
        let mut observed_price_cents: HashMap<String, i64> = HashMap::new();
        let mut observed_category: HashMap<String, String> = HashMap::new();
        for group in groups {
            for row in &group.rows {
                observed_price_cents
                    .entry(row.item_name.clone())
                    .or_insert(row.unit_price_cents);
                if let Some(category) = &row.item_category {
                    observed_category
                        .entry(row.item_name.clone())
                        .or_insert_with(|| category.clone());
                }
            }
        }
        let mut names: Vec<String> = observed_price_cents.keys().cloned().collect();
        names.sort();

        let category_account_map = match &config.inventory.category_account_map_path {
            Some(path) => load_category_account_map(path)?,
            None => HashMap::new(),
        };

        let found = {
            let _permit = reads.acquire().await.expect("semaphore not closed");
            self.client
                .query_items(bearer_token, &names)
                .await
                .map_err(|e| UploadError::Network(e.to_string()))?
        };
        let mut item_map: HashMap<String, RemoteItem> =
            found.into_iter().map(|i| (i.name.clone(), i)).collect();

        let sync_mode = config.inventory.sync_mode;
        for name in &names {
            let observed_price = observed_price_cents[name];
            match item_map.get(name).cloned() {
                None => {
                    let item_type = if config.inventory.enabled {
                        ItemType::Inventory
                    } else {
                        ItemType::Service
                    };
                    let accounts = if matches!(item_type, ItemType::Inventory) {
                        resolve_accounts_for_item(name, &observed_category, &category_account_map)
                    } else {
                        None
                    };
                    let created = self
                        .client
                        .create_item(
                            bearer_token,
                            NewItem {
                                name: name.clone(),
                                item_type,
                                price_cents: Some(observed_price),
                                cost_cents: None,
                                accounts,
                            },
                        )
                        .await
                        .map_err(|e| UploadError::Network(e.to_string()))?;
                    item_map.insert(name.clone(), created);
                }
                Some(existing) => {
                    if matches!(sync_mode, ConfigInventorySyncMode::Inline) {
                        self.maybe_patch(&existing, observed_price, bearer_token)
                            .await?;
                    }
                }
            }
        }

        Ok(item_map)
    }

    /// Patches an existing item's price when it has drifted from what this
    /// run observed by more than a cent. Cost is never
    /// patched here: the tenant's category/account mapping owns cost, not
    /// the per-row price seen in a POS export.
    async fn maybe_patch(
        &self,
        existing: &RemoteItem,
        observed_price_cents: i64,
        bearer_token: &mut String,
    ) -> Result<(), UploadError> {
        let drift = (existing.price_cents.unwrap_or(0) - observed_price_cents).abs();
        if drift <= PRICE_DRIFT_THRESHOLD_CENTS {
            return Ok(());
        }
        self.client
            .patch_item(
                bearer_token,
                ItemPatch {
                    name: existing.name.clone(),
                    price_cents: Some(observed_price_cents),
                    cost_cents: None,
                },
            )
            .await
            .map_err(|e| UploadError::Network(e.to_string()))
    }

    async fn create_document_with_retry(
        &self,
        payload: &DocumentPayload,
        bearer_token: &mut String,
        refresher: &dyn TokenRefresher,
        refreshed_once: &mut bool,
    ) -> Result<CreateDocumentOutcome, UploadError> {
        match self.client.create_document(bearer_token, payload).await {
            Ok(outcome) => Ok(outcome),
            Err(RemoteError::Unauthorized) if !*refreshed_once => {
                *refreshed_once = true;
                let new_token = refresher.refresh().await?;
                *bearer_token = new_token;
                self.client
                    .create_document(bearer_token, payload)
                    .await
                    .map_err(|e| match e {
                        RemoteError::Unauthorized => {
                            UploadError::Token("second consecutive 401 from remote service".to_string())
                        }
                        other => UploadError::Network(other.to_string()),
                    })
            }
            Err(RemoteError::Unauthorized) => Err(UploadError::Token(
                "401 from remote service after the run's one token refresh".to_string(),
            )),
            Err(e) => Err(UploadError::Network(e.to_string())),
        }
    }

    /// Applies the negative-inventory policy to a completed
    /// create-document call. Returns collected warnings on success.
    fn apply_create_outcome(
        &self,
        outcome: CreateDocumentOutcome,
        config: &CompanyConfig,
    ) -> Result<Vec<String>, UploadError> {
        match outcome {
            CreateDocumentOutcome::Created { remote_id } => {
                info!(%remote_id, "document created");
                Ok(Vec::new())
            }
            CreateDocumentOutcome::Warned { remote_id, warnings } => {
                if config.inventory.enabled && config.inventory.allow_negative_inventory {
                    info!(%remote_id, ?warnings, "document created with inventory warnings, continuing");
                    Ok(warnings)
                } else {
                    Err(UploadError::InventoryBlocked(format!(
                        "remote issued inventory warnings and allow_negative_inventory is disabled: {}",
                        warnings.join("; ")
                    )))
                }
            }
            CreateDocumentOutcome::RejectedInventory { message } => {
                Err(UploadError::InventoryBlocked(message))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CategoryAccountRow {
    category: String,
    asset_account: String,
    income_account: String,
    cogs_account: String,
}

/// Loads the tenant's product category → asset/income/COGS account mapping,
/// keyed by category name.
fn load_category_account_map(path: &Path) -> Result<HashMap<String, AccountTriple>, UploadError> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(crate::error::UploadError::Csv)?;
    let mut map = HashMap::new();
    for record in reader.deserialize() {
        let row: CategoryAccountRow = record.map_err(crate::error::UploadError::Csv)?;
        map.insert(
            row.category,
            AccountTriple {
                asset_account: row.asset_account,
                income_account: row.income_account,
                cogs_account: row.cogs_account,
            },
        );
    }
    Ok(map)
}

/// Resolves the account triple a newly created inventory item should post
/// against, by the category this run observed for it. Missing category
/// data or an unmapped category leaves the item without an account triple
/// rather than failing the whole item-creation step; the remote service is
/// expected to fall back to its own default accounts in that case.
fn resolve_accounts_for_item(
    item_name: &str,
    observed_category: &HashMap<String, String>,
    category_account_map: &HashMap<String, AccountTriple>,
) -> Option<AccountTriple> {
    let category = observed_category.get(item_name)?;
    match category_account_map.get(category) {
        Some(accounts) => Some(accounts.clone()),
        None => {
            warn!(item_name, category, "no account mapping for category, item will use remote defaults");
            None
        }
    }
}

/// Swaps lines whose inventory item's `inventory_start_date` is after the
/// document's transaction date to the tenant's configured fallback
/// service item, preserving monetary totals and leaving an audit note
///.
fn apply_backdated_bypass(
    payload: &mut DocumentPayload,
    item_map: &HashMap<String, RemoteItem>,
    config: &CompanyConfig,
) {
    for line in &mut payload.lines {
        let Some(item) = item_map.get(&line.item_name) else {
            continue;
        };
        let Some(start_date) = item.inventory_start_date else {
            continue;
        };
        if start_date > payload.transaction_date {
            let original = line.item_name.clone();
            line.description = Some(format!(
                "bypassed from inventory item {original} (inventory start date {start_date})"
            ));
            line.item_name = config.inventory.fallback_service_item.clone();
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake_refresher {
    use super::{TokenRefresher, UploadError};
    use parking_lot::Mutex;

    /// Returns `token` on every call, or the injected failure once, then
    /// falls back to `token`. Used to exercise the "second 401 is fatal"
    /// and "token expiring mid-upload" boundary behaviors.
    pub struct FakeTokenRefresher {
        token: String,
        fail_once: Mutex<bool>,
    }

    impl FakeTokenRefresher {
        pub fn new(token: impl Into<String>) -> Self {
            Self {
                token: token.into(),
                fail_once: Mutex::new(false),
            }
        }

        pub fn failing_once(token: impl Into<String>) -> Self {
            Self {
                token: token.into(),
                fail_once: Mutex::new(true),
            }
        }
    }

    #[async_trait::async_trait]
    impl TokenRefresher for FakeTokenRefresher {
        async fn refresh(&self) -> Result<String, UploadError> {
            let mut fail_once = self.fail_once.lock();
            if *fail_once {
                *fail_once = false;
                return Err(UploadError::Token("refresh failed (fake)".to_string()));
            }
            Ok(self.token.clone())
        }
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
