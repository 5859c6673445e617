//! Platform purchase bridge.

use crate::error::Result;
use crate::receipt::ReceiptData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Channel id of Apple in-app purchase.
pub const APPLE_IAP_CHANNEL: &str = "appleiap";

/// Host operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS, the only platform with in-app purchase support.
    Ios,
    /// Android.
    Android,
    /// Anything else.
    Other,
}

/// Payment channel offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentChannel {
    /// Channel id, e.g. `appleiap`.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub description: String,
}

/// Product as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProduct {
    /// Store product identifier.
    pub product_id: String,
    /// Localized title.
    #[serde(default)]
    pub title: String,
    /// Localized price string.
    #[serde(default)]
    pub price: String,
}

/// Result of a completed platform purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    /// Platform transaction identifier.
    pub transaction_identifier: Option<String>,
    /// Purchased product.
    pub product_id: String,
    /// App receipt covering the purchase.
    pub receipt: Option<ReceiptData>,
}

/// Transaction returned by a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredTransaction {
    /// Product the transaction was for.
    pub product_id: String,
    /// Platform transaction identifier.
    pub transaction_identifier: Option<String>,
}

/// Access to the platform's payment APIs.
///
/// Implementations wrap the host runtime; every call resolves once the
/// platform has answered.
#[async_trait]
pub trait PurchaseBridge: Send + Sync {
    /// Platform the app is running on.
    fn platform(&self) -> Platform;

    /// Available payment channels.
    async fn channels(&self) -> Result<Vec<PaymentChannel>>;

    /// Look up `product_ids` in the store.
    async fn query_products(
        &self,
        channel: &PaymentChannel,
        product_ids: &[&str],
    ) -> Result<Vec<StoreProduct>>;

    /// Run the purchase sheet for `product_id`.
    async fn purchase(&self, channel: &PaymentChannel, product_id: &str) -> Result<PurchaseReceipt>;

    /// Mark a transaction as finished so the store stops redelivering it.
    async fn finish(&self, channel: &PaymentChannel, transaction_identifier: &str) -> Result<()>;

    /// Redeliver past transactions.
    async fn restore(&self, channel: &PaymentChannel) -> Result<Vec<RestoredTransaction>>;
}

#[async_trait]
impl<T: PurchaseBridge + ?Sized> PurchaseBridge for Arc<T> {
    fn platform(&self) -> Platform {
        (**self).platform()
    }

    async fn channels(&self) -> Result<Vec<PaymentChannel>> {
        (**self).channels().await
    }

    async fn query_products(
        &self,
        channel: &PaymentChannel,
        product_ids: &[&str],
    ) -> Result<Vec<StoreProduct>> {
        (**self).query_products(channel, product_ids).await
    }

    async fn purchase(&self, channel: &PaymentChannel, product_id: &str) -> Result<PurchaseReceipt> {
        (**self).purchase(channel, product_id).await
    }

    async fn finish(&self, channel: &PaymentChannel, transaction_identifier: &str) -> Result<()> {
        (**self).finish(channel, transaction_identifier).await
    }

    async fn restore(&self, channel: &PaymentChannel) -> Result<Vec<RestoredTransaction>> {
        (**self).restore(channel).await
    }
}
