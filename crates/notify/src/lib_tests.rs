// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn summary() -> RunSummary {
    RunSummary {
        tenant: "acme".to_string(),
        scope: "2025-12-27".to_string(),
        status: "succeeded".to_string(),
        counts: RunCounts {
            rows_in: 500,
            docs_uploaded: 12,
            docs_skipped_dup: 0,
            docs_failed: 0,
        },
        source_total_cents: 123_456,
        remote_total_cents: 123_456,
        reconcile_status: ReconcileStatus::Match,
        difference_cents: 0,
    }
}

#[test]
fn text_fallback_includes_tenant_and_counts() {
    let text = summary().text_fallback();
    assert!(text.contains("acme"));
    assert!(text.contains("12 uploaded"));
    assert!(text.contains("match"));
}

#[tokio::test]
async fn fake_sink_records_delivered_summary() {
    let sink = FakeNotificationSink::new();
    sink.notify("https://hooks.example/acme", &summary())
        .await
        .unwrap();

    let calls = sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].webhook_url, "https://hooks.example/acme");
    assert_eq!(calls[0].summary.tenant, "acme");
}

#[tokio::test]
async fn fake_sink_injected_failure_does_not_record_a_call() {
    let sink = FakeNotificationSink::new();
    sink.fail_next_call();
    let result = sink.notify("https://hooks.example/acme", &summary()).await;
    assert!(result.is_err());
    assert!(sink.calls().is_empty());
}

#[tokio::test]
async fn webhook_sink_posts_json_with_text_fallback_and_returns_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({
            "summary": { "tenant": "acme" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookNotificationSink::new(reqwest::Client::new());
    let webhook_url = format!("{}/hook", server.uri());
    sink.notify(&webhook_url, &summary()).await.unwrap();

    // notify() is fire-and-forget: it returns before the spawned task
    // necessarily completes, so give the task a moment to land before
    // wiremock verifies its expectation on drop.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    server.verify().await;
}

#[tokio::test]
async fn webhook_sink_logs_and_swallows_delivery_failure() {
    // No mock registered: the POST will fail or 404. `notify` must still
    // return Ok, since a failed notification never fails the run
    //.
    let sink = WebhookNotificationSink::new(reqwest::Client::new());
    let result = sink.notify("http://127.0.0.1:1/unreachable", &summary()).await;
    assert!(result.is_ok());
}
