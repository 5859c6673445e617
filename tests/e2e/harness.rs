//! Test harness wiring the client components to scripted collaborators.
//!
//! `TestHarness` builds a real `ReceiptVerifier`, `IapManager` and
//! `MemoLimiter` over in-memory stand-ins for Apple's endpoint, the backend
//! ledger, the memo list and the platform purchase sheet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mjapp_client::api::{DeductRequest, RechargeRequest};
use mjapp_client::config::{CurrencyConfig, ReceiptConfig};
use mjapp_client::iap::{
    IapManager, PaymentChannel, Platform, PurchaseBridge, PurchaseReceipt, RestoredTransaction,
    StoreProduct, APPLE_IAP_CHANNEL,
};
use mjapp_client::receipt::{
    RawResponse, ReceiptData, ReceiptTransport, ReceiptVerifier, TransactionMatcher,
    TransportError, VerifyRequest,
};
use mjapp_client::{
    create_event_channel, ClientEventsChannel, CurrencyLedger, CurrencyManager, Error,
    MemoCounter, MemoLimiter, Result,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Bundle id every fixture receipt is issued for.
pub const BUNDLE_ID: &str = "com.yourcompany.mjapp";

/// Receipt blob handed out by the fake purchase sheet.
pub const RECEIPT_B64: &str = "TUlJVDBnWUpLb1pJaHZjTkFRY0M=";

/// Verifier settings pointing at the fixture bundle.
pub fn receipt_config() -> ReceiptConfig {
    ReceiptConfig {
        shared_secret: "integration-secret".to_string(),
        bundle_id: BUNDLE_ID.to_string(),
        ..ReceiptConfig::default()
    }
}

/// One `in_app` entry.
pub fn in_app(transaction_id: &str, product_id: &str, purchased: DateTime<Utc>) -> Value {
    json!({
        "transaction_id": transaction_id,
        "original_transaction_id": transaction_id,
        "product_id": product_id,
        "purchase_date_ms": purchased.timestamp_millis().to_string(),
        "quantity": "1",
        "is_trial_period": "false"
    })
}

/// A status 0 body for `environment` holding `in_app`.
pub fn receipt_body(environment: &str, in_app: Vec<Value>) -> Value {
    json!({
        "status": 0,
        "environment": environment,
        "receipt": { "bundle_id": BUNDLE_ID, "in_app": in_app }
    })
}

/// A bare status body.
pub fn status_body(status: i64) -> Value {
    json!({ "status": status })
}

/// Apple endpoint stand-in replaying queued outcomes.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<std::result::Result<RawResponse, TransportError>>>,
    calls: Mutex<Vec<(String, VerifyRequest)>>,
    latency: Duration,
}

impl ScriptedTransport {
    /// Transport with no queued replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that sleeps before every reply.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Queue a response body.
    pub fn reply(self, body: Value) -> Self {
        self.replies.lock().push_back(Ok(RawResponse::new(body)));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    /// URLs posted to, in order.
    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Requests posted, in order.
    pub fn requests(&self) -> Vec<VerifyRequest> {
        self.calls.lock().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl ReceiptTransport for ScriptedTransport {
    async fn post(
        &self,
        url: &str,
        request: &VerifyRequest,
    ) -> std::result::Result<RawResponse, TransportError> {
        self.calls.lock().push((url.to_string(), request.clone()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())))
    }
}

/// Backend credit ledger stand-in.
#[derive(Default)]
pub struct FakeLedger {
    /// Current balance.
    pub balance: Mutex<u64>,
    /// Recorded top-ups.
    pub recharges: Mutex<Vec<RechargeRequest>>,
    /// Recorded spends.
    pub deductions: Mutex<Vec<DeductRequest>>,
}

#[async_trait]
impl CurrencyLedger for FakeLedger {
    async fn balance(&self) -> Result<u64> {
        Ok(*self.balance.lock())
    }

    async fn recharge(&self, request: &RechargeRequest) -> Result<Value> {
        *self.balance.lock() += request.amount;
        self.recharges.lock().push(request.clone());
        Ok(json!({ "balance": *self.balance.lock() }))
    }

    async fn deduct(&self, request: &DeductRequest) -> Result<Value> {
        let mut balance = self.balance.lock();
        if *balance < request.amount {
            return Err(Error::Api {
                code: 400,
                message: "insufficient balance".to_string(),
            });
        }
        *balance -= request.amount;
        self.deductions.lock().push(request.clone());
        Ok(json!({ "balance": *balance }))
    }
}

/// Memo list stand-in.
#[derive(Default)]
pub struct FakeCounter {
    /// Memos owned.
    pub count: Mutex<u64>,
}

#[async_trait]
impl MemoCounter for FakeCounter {
    async fn memo_count(&self) -> Result<u64> {
        Ok(*self.count.lock())
    }
}

/// Purchase sheet stand-in. Every purchase reports `transaction_id`.
pub struct FakeBridge {
    /// Transaction id reported by the next purchase.
    pub transaction_id: Mutex<String>,
    /// Transactions finished so far.
    pub finished: Mutex<Vec<String>>,
}

impl Default for FakeBridge {
    fn default() -> Self {
        Self {
            transaction_id: Mutex::new("1000000001".to_string()),
            finished: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PurchaseBridge for FakeBridge {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    async fn channels(&self) -> Result<Vec<PaymentChannel>> {
        Ok(vec![
            PaymentChannel {
                id: "alipay".to_string(),
                description: String::new(),
            },
            PaymentChannel {
                id: APPLE_IAP_CHANNEL.to_string(),
                description: "App Store".to_string(),
            },
        ])
    }

    async fn query_products(
        &self,
        _channel: &PaymentChannel,
        product_ids: &[&str],
    ) -> Result<Vec<StoreProduct>> {
        Ok(product_ids
            .iter()
            .map(|id| StoreProduct {
                product_id: (*id).to_string(),
                title: String::new(),
                price: String::new(),
            })
            .collect())
    }

    async fn purchase(&self, _channel: &PaymentChannel, product_id: &str) -> Result<PurchaseReceipt> {
        Ok(PurchaseReceipt {
            transaction_identifier: Some(self.transaction_id.lock().clone()),
            product_id: product_id.to_string(),
            receipt: Some(ReceiptData::from(RECEIPT_B64)),
        })
    }

    async fn finish(&self, _channel: &PaymentChannel, transaction_identifier: &str) -> Result<()> {
        self.finished.lock().push(transaction_identifier.to_string());
        Ok(())
    }

    async fn restore(&self, _channel: &PaymentChannel) -> Result<Vec<RestoredTransaction>> {
        Ok(Vec::new())
    }
}

/// Fully wired client components.
pub struct TestHarness {
    /// Apple endpoint stand-in.
    pub transport: Arc<ScriptedTransport>,
    /// Backend ledger stand-in.
    pub ledger: Arc<FakeLedger>,
    /// Memo list stand-in.
    pub counter: Arc<FakeCounter>,
    /// Purchase sheet stand-in.
    pub bridge: Arc<FakeBridge>,
    /// Shared verifier.
    pub verifier: ReceiptVerifier,
    /// Purchase flow.
    pub iap: IapManager<Arc<FakeBridge>, Arc<FakeLedger>>,
    /// Memo limits.
    pub limiter: MemoLimiter<Arc<FakeCounter>, Arc<FakeLedger>>,
    /// Client events.
    pub events: ClientEventsChannel,
}

impl TestHarness {
    /// Wire everything over `transport`.
    ///
    /// # Panics
    ///
    /// Panics if the fixture config is rejected.
    #[allow(clippy::expect_used)]
    pub fn setup(transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let verifier = ReceiptVerifier::with_transport(
            receipt_config(),
            Arc::clone(&transport) as Arc<dyn ReceiptTransport>,
        )
        .expect("fixture config is valid");

        let ledger = Arc::new(FakeLedger::default());
        let counter = Arc::new(FakeCounter::default());
        let bridge = Arc::new(FakeBridge::default());
        let (tx, events) = create_event_channel();

        let iap = IapManager::new(
            Arc::clone(&bridge),
            TransactionMatcher::new(verifier.clone()),
            CurrencyManager::new(Arc::clone(&ledger), CurrencyConfig::default()),
            tx.clone(),
        );
        let limiter = MemoLimiter::new(
            Arc::clone(&counter),
            CurrencyManager::new(Arc::clone(&ledger), CurrencyConfig::default()),
            tx,
        );

        Self {
            transport,
            ledger,
            counter,
            bridge,
            verifier,
            iap,
            limiter,
            events,
        }
    }
}
