// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Notification Sink: a fire-and-forget outbound
//! webhook with per-tenant routing, posting a structured JSON summary of
//! a finished run with a text fallback.
//!
//! A `Clone + Send + Sync` adapter trait with a real and a fake
//! implementation, but the transport is an HTTPS webhook POST instead of
//! a desktop notification center call: an HTTPS webhook POST is the
//! relevant external collaborator here.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use async_trait::async_trait;
use oiat_core::ReconcileStatus;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Per-run counts, echoing `RunArtifact`'s fields summed across every date
/// an orchestrator run processed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub rows_in: u64,
    pub docs_uploaded: u64,
    pub docs_skipped_dup: u64,
    pub docs_failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tenant: String,
    /// A human-readable description of the run's target, e.g. a single
    /// date or a date range.
    pub scope: String,
    pub status: String,
    pub counts: RunCounts,
    pub source_total_cents: i64,
    pub remote_total_cents: i64,
    pub reconcile_status: ReconcileStatus,
    pub difference_cents: i64,
}

impl RunSummary {
    /// The text fallback permitted alongside the JSON payload,
    /// for webhook receivers that only render a `text` field (e.g. a
    /// bare Slack incoming webhook with no Block Kit support).
    pub fn text_fallback(&self) -> String {
        format!(
            "[{}] {} {}: {} uploaded, {} skipped, {} failed (reconcile: {}, diff {}c)",
            self.tenant,
            self.scope,
            self.status,
            self.counts.docs_uploaded,
            self.counts.docs_skipped_dup,
            self.counts.docs_failed,
            self.reconcile_status,
            self.difference_cents,
        )
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: String,
    summary: &'a RunSummary,
}

/// Adapter for sending a finished run's summary to an outbound webhook.
#[async_trait]
pub trait NotificationSink: Clone + Send + Sync + 'static {
    /// `webhook_url` is resolved by the caller from the tenant's
    /// configured `slack_webhook_env`; a tenant with no
    /// configured webhook never reaches this call.
    async fn notify(&self, webhook_url: &str, summary: &RunSummary) -> Result<(), NotifyError>;
}

/// Real outbound webhook adapter. Posts are fire-and-forget: a failed
/// delivery is logged and swallowed rather than failing the run, since a
/// notification is a courtesy, not part of the pipeline's correctness
/// substrate.
#[derive(Clone)]
pub struct WebhookNotificationSink {
    http: reqwest::Client,
}

impl WebhookNotificationSink {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Default for WebhookNotificationSink {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(&self, webhook_url: &str, summary: &RunSummary) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            text: summary.text_fallback(),
            summary,
        };
        let http = self.http.clone();
        let webhook_url = webhook_url.to_string();
        let body = serde_json::to_value(&payload)
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        // Fire-and-forget: spawn and return immediately so the
        // orchestrator never blocks on webhook latency.
        tokio::spawn(async move {
            match http.post(&webhook_url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(url = %webhook_url, "notification sent");
                }
                Ok(resp) => {
                    tracing::warn!(url = %webhook_url, status = %resp.status(), "notification webhook rejected payload");
                }
                Err(e) => {
                    tracing::warn!(url = %webhook_url, error = %e, "notification webhook send failed");
                }
            }
        });
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{NotificationSink, NotifyError, RunSummary};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct NotifyCall {
        pub webhook_url: String,
        pub summary: RunSummary,
    }

    struct FakeState {
        calls: Vec<NotifyCall>,
        fail_next: bool,
    }

    /// Records every call synchronously instead of spawning, so tests can
    /// assert on delivered summaries without a runtime race.
    #[derive(Clone)]
    pub struct FakeNotificationSink {
        inner: Arc<Mutex<FakeState>>,
    }

    impl Default for FakeNotificationSink {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    calls: Vec::new(),
                    fail_next: false,
                })),
            }
        }
    }

    impl FakeNotificationSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<NotifyCall> {
            self.inner.lock().calls.clone()
        }

        pub fn fail_next_call(&self) {
            self.inner.lock().fail_next = true;
        }
    }

    #[async_trait]
    impl NotificationSink for FakeNotificationSink {
        async fn notify(&self, webhook_url: &str, summary: &RunSummary) -> Result<(), NotifyError> {
            let mut state = self.inner.lock();
            if state.fail_next {
                state.fail_next = false;
                return Err(NotifyError::SendFailed("fake failure".to_string()));
            }
            state.calls.push(NotifyCall {
                webhook_url: webhook_url.to_string(),
                summary: summary.clone(),
            });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotificationSink, NotifyCall};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
