//! Purchase and memo capacity flows through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{in_app, receipt_body, status_body, ScriptedTransport, TestHarness};
use chrono::{TimeDelta, Utc};
use mjapp_client::iap::recommend_for_currency;
use mjapp_client::receipt::FailureCode;
use mjapp_client::{ClientEvent, Error, ExpandOutcome};

/// Buying credits after hitting the memo limit lets the next memo through.
#[tokio::test]
async fn test_buy_credits_then_expand_capacity() {
    let transport = ScriptedTransport::new()
        .reply(status_body(21007))
        .reply(receipt_body(
            "Sandbox",
            vec![in_app("1000000001", "mjapp.currency.6", Utc::now())],
        ));
    let mut harness = TestHarness::setup(transport);
    *harness.counter.count.lock() = 20;

    assert!(matches!(
        harness.limiter.create_memo(true).await,
        Err(Error::MemoLimit(_))
    ));

    assert!(harness.iap.init().await);
    let product = recommend_for_currency(1);
    assert_eq!(product.product_id, "mjapp.currency.1");

    let outcome = harness.iap.purchase("mjapp.currency.6").await.unwrap();
    assert_eq!(outcome.credits, 6);
    assert_eq!(*harness.ledger.balance.lock(), 6);
    assert_eq!(harness.ledger.recharges.lock()[0].source, "purchase");
    assert_eq!(*harness.bridge.finished.lock(), vec!["1000000001".to_string()]);

    let counts = harness.limiter.create_memo(true).await.unwrap();
    assert_eq!(counts.current_count, 21);
    assert_eq!(*harness.ledger.balance.lock(), 5);

    let mut events = Vec::new();
    while let Ok(event) = harness.events.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&ClientEvent::PurchaseCompleted {
        product_id: "mjapp.currency.6".to_string(),
        credits: 6,
        transaction_id: "1000000001".to_string(),
    }));
    assert!(events.contains(&ClientEvent::CapacityExpanded { amount: 1 }));
}

/// A replayed purchase older than a day is refused and nothing is credited.
#[tokio::test]
async fn test_stale_purchase_is_not_credited() {
    let transport = ScriptedTransport::new().reply(receipt_body(
        "Production",
        vec![in_app(
            "1000000001",
            "mjapp.currency.30",
            Utc::now() - TimeDelta::hours(30),
        )],
    ));
    let harness = TestHarness::setup(transport);
    assert!(harness.iap.init().await);

    let err = harness.iap.purchase("mjapp.currency.30").await.unwrap_err();

    assert!(matches!(
        err,
        Error::Receipt(ref failure) if matches!(failure.code, FailureCode::TransactionExpired { .. })
    ));
    assert_eq!(*harness.ledger.balance.lock(), 0);
    assert!(harness.bridge.finished.lock().is_empty());
    assert_eq!(harness.iap.pending_count(), 0);
}

/// Expansion reports the shortfall instead of spending.
#[tokio::test]
async fn test_expansion_without_credits() {
    let harness = TestHarness::setup(ScriptedTransport::new());
    *harness.ledger.balance.lock() = 2;

    let outcome = harness.limiter.expand_capacity(3).await.unwrap();

    assert_eq!(
        outcome,
        ExpandOutcome::Insufficient {
            required: 3,
            balance: 2
        }
    );
    assert!(harness.ledger.deductions.lock().is_empty());

    let status = harness.limiter.status().await;
    assert!(status.can_create_memo);
    assert_eq!(harness.limiter.limit_message(&status), "20 free memos left");
}
