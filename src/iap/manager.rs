//! Purchase orchestration.

use super::bridge::{
    PaymentChannel, Platform, PurchaseBridge, RestoredTransaction, StoreProduct, APPLE_IAP_CHANNEL,
};
use super::products::{catalog_ids, find_product, ProductInfo};
use crate::currency::{CurrencyLedger, CurrencyManager, SOURCE_PURCHASE};
use crate::error::{Error, Result};
use crate::event::{ClientEvent, ClientEventsSender};
use crate::receipt::{ReceiptData, TransactionMatcher};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, info, warn};

const ID_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// A store product joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableProduct {
    /// What the store reported.
    pub store: StoreProduct,
    /// Catalog entry.
    pub info: &'static ProductInfo,
}

/// A verified and credited purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOutcome {
    /// Purchased product.
    pub product_id: String,
    /// Credits added.
    pub credits: u64,
    /// Platform transaction identifier.
    pub transaction_id: String,
    /// Receipt the purchase was verified against.
    pub receipt: ReceiptData,
}

#[derive(Debug, Clone)]
struct PendingPurchase {
    product_id: String,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct IapState {
    channel: Option<PaymentChannel>,
    products: Vec<AvailableProduct>,
    pending: HashMap<String, PendingPurchase>,
}

/// Drives purchases from the store sheet through receipt verification to
/// crediting the balance.
pub struct IapManager<B, L> {
    bridge: B,
    matcher: TransactionMatcher,
    currency: CurrencyManager<L>,
    events: ClientEventsSender,
    state: Mutex<IapState>,
}

impl<B: PurchaseBridge, L: CurrencyLedger> IapManager<B, L> {
    /// Create an uninitialised manager.
    #[must_use]
    pub fn new(
        bridge: B,
        matcher: TransactionMatcher,
        currency: CurrencyManager<L>,
        events: ClientEventsSender,
    ) -> Self {
        Self {
            bridge,
            matcher,
            currency,
            events,
            state: Mutex::new(IapState::default()),
        }
    }

    /// Connect to the Apple channel, load products and process restored
    /// transactions. Returns whether purchases are available.
    pub async fn init(&self) -> bool {
        if self.bridge.platform() != Platform::Ios {
            warn!("In-app purchase is not supported on this platform");
            return false;
        }

        match self.connect().await {
            Ok(count) => {
                info!("In-app purchase ready with {count} products");
                true
            }
            Err(e) => {
                warn!("In-app purchase initialisation failed: {e}");
                false
            }
        }
    }

    async fn connect(&self) -> Result<usize> {
        let channel = self
            .bridge
            .channels()
            .await?
            .into_iter()
            .find(|c| c.id == APPLE_IAP_CHANNEL)
            .ok_or_else(|| Error::Purchase("Apple IAP channel not found".to_string()))?;

        let products: Vec<AvailableProduct> = self
            .bridge
            .query_products(&channel, &catalog_ids())
            .await?
            .into_iter()
            .filter_map(|store| {
                find_product(&store.product_id).map(|info| AvailableProduct { store, info })
            })
            .collect();
        if products.is_empty() {
            return Err(Error::Purchase("store returned no products".to_string()));
        }

        for transaction in self.bridge.restore(&channel).await? {
            self.handle_restored(&transaction);
        }

        let count = products.len();
        let mut state = self.state.lock();
        state.channel = Some(channel);
        state.products = products;
        Ok(count)
    }

    /// Whether [`init`](Self::init) succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().channel.is_some()
    }

    /// Products available for purchase.
    #[must_use]
    pub fn products(&self) -> Vec<AvailableProduct> {
        self.state.lock().products.clone()
    }

    /// Available product with `product_id`.
    #[must_use]
    pub fn product(&self, product_id: &str) -> Option<AvailableProduct> {
        self.state
            .lock()
            .products
            .iter()
            .find(|p| p.info.product_id == product_id)
            .cloned()
    }

    /// Purchases currently in progress.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Buy `product_id`, verify the receipt, credit the balance and finish
    /// the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Purchase`] if the manager is not initialised, the
    /// product is unknown or the platform purchase fails, [`Error::Receipt`]
    /// if the receipt does not contain a fresh matching transaction, or the
    /// ledger error if crediting fails.
    pub async fn purchase(&self, product_id: &str) -> Result<PurchaseOutcome> {
        let (channel, info) = {
            let state = self.state.lock();
            let channel = state
                .channel
                .clone()
                .ok_or_else(|| Error::Purchase("in-app purchase not initialised".to_string()))?;
            let info = state
                .products
                .iter()
                .find(|p| p.info.product_id == product_id)
                .map(|p| p.info)
                .ok_or_else(|| Error::Purchase(format!("unknown product: {product_id}")))?;
            (channel, info)
        };

        let pending_id = generate_transaction_id();
        self.state.lock().pending.insert(
            pending_id.clone(),
            PendingPurchase {
                product_id: product_id.to_string(),
                started_at: Utc::now(),
            },
        );

        let result = self.complete(&channel, info).await;

        let settled = self.state.lock().pending.remove(&pending_id);
        if let Some(pending) = settled {
            debug!(
                "Purchase {pending_id} of {} settled after {}ms",
                pending.product_id,
                (Utc::now() - pending.started_at).num_milliseconds()
            );
        }

        let event = match &result {
            Ok(outcome) => ClientEvent::PurchaseCompleted {
                product_id: outcome.product_id.clone(),
                credits: outcome.credits,
                transaction_id: outcome.transaction_id.clone(),
            },
            Err(e) => {
                warn!("Purchase of {product_id} failed: {e}");
                ClientEvent::PurchaseFailed {
                    product_id: product_id.to_string(),
                    message: e.to_string(),
                }
            }
        };
        let _ = self.events.send(event);
        result
    }

    async fn complete(
        &self,
        channel: &PaymentChannel,
        info: &'static ProductInfo,
    ) -> Result<PurchaseOutcome> {
        let purchase = self
            .bridge
            .purchase(channel, info.product_id)
            .await
            .map_err(|e| Error::Purchase(format!("purchase failed: {e}")))?;

        let receipt = purchase
            .receipt
            .filter(|r| !r.is_empty())
            .ok_or_else(|| Error::Purchase("purchase returned an empty receipt".to_string()))?;
        let transaction_id = purchase.transaction_identifier.ok_or_else(|| {
            Error::Purchase("purchase returned no transaction identifier".to_string())
        })?;

        let matched = self
            .matcher
            .match_transaction(&receipt, &transaction_id, info.product_id)
            .await?;
        let credits = info
            .credits
            .saturating_mul(u64::from(matched.transaction.quantity.max(1)));

        self.currency
            .add_balance(credits, &transaction_id, SOURCE_PURCHASE)
            .await?;
        self.bridge.finish(channel, &transaction_id).await?;
        info!(
            "Purchased {} for {credits} credits ({transaction_id}, {})",
            info.product_id,
            matched.environment()
        );

        Ok(PurchaseOutcome {
            product_id: info.product_id.to_string(),
            credits,
            transaction_id,
            receipt,
        })
    }

    /// Log a restored transaction. Credit packs are consumable, so a restore
    /// never grants credits.
    pub fn handle_restored(&self, transaction: &RestoredTransaction) {
        if find_product(&transaction.product_id).is_some() {
            info!(
                "Restored transaction for {} ({})",
                transaction.product_id,
                transaction.transaction_identifier.as_deref().unwrap_or("-")
            );
        } else {
            debug!("Ignoring restored transaction for {}", transaction.product_id);
        }
    }

    /// Drop pending purchases and loaded products; [`init`](Self::init) must
    /// run again before the next purchase.
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.products.clear();
        state.channel = None;
    }
}

/// Local purchase id: `iap_<unix millis>_<9 base-36 chars>`.
#[must_use]
pub fn generate_transaction_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())]))
        .collect();
    format!("iap_{}_{suffix}", Utc::now().timestamp_millis())
}
