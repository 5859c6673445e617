//! Receipt verification through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{in_app, receipt_body, status_body, ScriptedTransport, TestHarness, BUNDLE_ID, RECEIPT_B64};
use chrono::{TimeDelta, Utc};
use mjapp_client::config::{PRODUCTION_VERIFY_URL, SANDBOX_VERIFY_URL};
use mjapp_client::receipt::{
    Environment, FailureCode, ReceiptData, TransactionMatcher, TransportError,
};
use serde_json::json;
use std::time::Duration;

fn receipt() -> ReceiptData {
    ReceiptData::from(RECEIPT_B64)
}

/// A TestFlight receipt sent to production is retried once in the sandbox
/// and the accepted result is served from cache afterwards.
#[tokio::test]
async fn test_sandbox_receipt_falls_back_and_caches() {
    let transport = ScriptedTransport::new()
        .reply(status_body(21007))
        .reply(receipt_body(
            "Sandbox",
            vec![in_app("1000000001", "mjapp.currency.6", Utc::now())],
        ));
    let harness = TestHarness::setup(transport);

    let verified = harness.verifier.verify(&receipt()).await.unwrap();
    assert_eq!(verified.environment, Environment::Sandbox);
    assert_eq!(verified.bundle_id, BUNDLE_ID);
    assert_eq!(
        harness.transport.urls(),
        vec![PRODUCTION_VERIFY_URL, SANDBOX_VERIFY_URL]
    );

    let request = &harness.transport.requests()[0];
    assert_eq!(request.receipt_data, RECEIPT_B64);
    assert_eq!(request.password, "integration-secret");
    assert!(request.exclude_old_transactions);

    let again = harness.verifier.verify(&receipt()).await.unwrap();
    assert_eq!(again, verified);
    assert_eq!(harness.transport.urls().len(), 2);
    assert_eq!(harness.verifier.cache_stats().hits, 1);
}

/// Concurrent callers with the same receipt share one round trip.
#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_request() {
    let transport = ScriptedTransport::with_latency(Duration::from_millis(200)).reply(
        receipt_body(
            "Production",
            vec![in_app("1000000001", "mjapp.currency.6", Utc::now())],
        ),
    );
    let harness = TestHarness::setup(transport);
    let verifier = harness.verifier.clone();

    let (ra, rb, rc) = (receipt(), receipt(), receipt());
    let (a, b, c) = tokio::join!(
        verifier.verify(&ra),
        verifier.verify(&rb),
        verifier.verify(&rc),
    );

    assert_eq!(harness.transport.urls().len(), 1);
    assert_eq!(a.unwrap(), b.clone().unwrap());
    assert_eq!(b, c);
}

/// Three transport failures exhaust the retries with linear backoff.
#[tokio::test(start_paused = true)]
async fn test_transport_failures_exhaust_retries() {
    let transport = ScriptedTransport::new()
        .fail(TransportError::Timeout(Duration::from_secs(10)))
        .fail(TransportError::Network("reset".into()))
        .fail(TransportError::Network("reset".into()));
    let harness = TestHarness::setup(transport);

    let started = tokio::time::Instant::now();
    let failure = harness.verifier.verify(&receipt()).await.unwrap_err();

    assert_eq!(failure.code, FailureCode::NetworkError);
    assert_eq!(harness.transport.urls().len(), 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
}

/// A receipt issued to another app is rejected with both bundle ids.
#[tokio::test]
async fn test_foreign_bundle_is_rejected() {
    let transport = ScriptedTransport::new().reply(json!({
        "status": 0,
        "receipt": { "bundle_id": "com.example.other", "in_app": [] }
    }));
    let harness = TestHarness::setup(transport);

    let failure = harness.verifier.verify(&receipt()).await.unwrap_err();
    let body = serde_json::to_value(&failure).unwrap();

    assert_eq!(body["code"], "BUNDLE_ID_MISMATCH");
    assert_eq!(body["expected"], BUNDLE_ID);
    assert_eq!(body["actual"], "com.example.other");
}

/// Apple's own rejections keep their numeric status and raw response.
#[tokio::test]
async fn test_rejected_receipt_keeps_status() {
    let harness = TestHarness::setup(ScriptedTransport::new().reply(status_body(21003)));

    let failure = harness.verifier.verify(&receipt()).await.unwrap_err();

    assert_eq!(failure.code.status(), Some(21003));
    assert_eq!(failure.response, Some(status_body(21003)));
    assert_eq!(harness.transport.urls().len(), 1);
}

/// The matcher only accepts a recent transaction with both ids matching.
#[tokio::test]
async fn test_matcher_enforces_age_and_ids() {
    let now = Utc::now();
    let body = receipt_body(
        "Production",
        vec![
            in_app("1000000001", "mjapp.currency.6", now - TimeDelta::hours(1)),
            in_app("1000000002", "mjapp.currency.18", now - TimeDelta::hours(25)),
        ],
    );
    let harness = TestHarness::setup(ScriptedTransport::new().reply(body));
    let matcher = TransactionMatcher::new(harness.verifier.clone());

    let matched = matcher
        .match_transaction(&receipt(), "1000000001", "mjapp.currency.6")
        .await
        .unwrap();
    assert_eq!(matched.transaction.product_id, "mjapp.currency.6");
    assert_eq!(matched.environment(), Environment::Production);

    let wrong_product = matcher
        .match_transaction(&receipt(), "1000000001", "mjapp.currency.18")
        .await
        .unwrap_err();
    assert_eq!(wrong_product.code, FailureCode::TransactionNotFound);

    let stale = matcher
        .match_transaction(&receipt(), "1000000002", "mjapp.currency.18")
        .await
        .unwrap_err();
    assert!(matches!(
        stale.code,
        FailureCode::TransactionExpired { age } if age > TimeDelta::hours(24)
    ));

    // All three lookups were answered from one verification.
    assert_eq!(harness.transport.urls().len(), 1);
}
