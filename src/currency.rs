//! Compute-credit balance management.
//!
//! The backend owns the balance; this module validates amounts and maps
//! ledger failures the way the UI expects (a failed balance read shows 0).

use crate::api::{ApiClient, ApiEnvelope, DeductRequest, RechargeRequest};
use crate::config::CurrencyConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default source recorded for a top-up.
pub const SOURCE_PURCHASE: &str = "purchase";

/// Default reason recorded for a spend.
pub const REASON_MEMO_EXPANSION: &str = "memo_expansion";

/// Backend operations on the credit balance.
#[async_trait]
pub trait CurrencyLedger: Send + Sync {
    /// Current balance.
    async fn balance(&self) -> Result<u64>;

    /// Add credits.
    async fn recharge(&self, request: &RechargeRequest) -> Result<serde_json::Value>;

    /// Spend credits.
    async fn deduct(&self, request: &DeductRequest) -> Result<serde_json::Value>;
}

#[async_trait]
impl CurrencyLedger for ApiClient {
    async fn balance(&self) -> Result<u64> {
        self.currency_balance().await
    }

    async fn recharge(&self, request: &RechargeRequest) -> Result<serde_json::Value> {
        self.currency_recharge(request).await.map(envelope_data)
    }

    async fn deduct(&self, request: &DeductRequest) -> Result<serde_json::Value> {
        self.currency_deduct(request).await.map(envelope_data)
    }
}

#[async_trait]
impl<T: CurrencyLedger + ?Sized> CurrencyLedger for Arc<T> {
    async fn balance(&self) -> Result<u64> {
        (**self).balance().await
    }

    async fn recharge(&self, request: &RechargeRequest) -> Result<serde_json::Value> {
        (**self).recharge(request).await
    }

    async fn deduct(&self, request: &DeductRequest) -> Result<serde_json::Value> {
        (**self).deduct(request).await
    }
}

fn envelope_data(envelope: ApiEnvelope) -> serde_json::Value {
    envelope.data
}

/// Credit balance operations over a [`CurrencyLedger`].
#[derive(Debug, Clone)]
pub struct CurrencyManager<L> {
    ledger: L,
    config: CurrencyConfig,
}

impl<L: CurrencyLedger> CurrencyManager<L> {
    /// Create a manager over `ledger`.
    #[must_use]
    pub fn new(ledger: L, config: CurrencyConfig) -> Self {
        Self { ledger, config }
    }

    /// Credit settings in use.
    #[must_use]
    pub fn config(&self) -> &CurrencyConfig {
        &self.config
    }

    /// Current balance, or 0 if the backend cannot be reached.
    pub async fn balance(&self) -> u64 {
        match self.ledger.balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Failed to fetch {} balance: {e}", self.config.currency_name);
                0
            }
        }
    }

    /// Add `amount` credits backed by `transaction_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Currency`] if `amount` is zero, or the ledger error.
    pub async fn add_balance(
        &self,
        amount: u64,
        transaction_id: &str,
        source: &str,
    ) -> Result<serde_json::Value> {
        if amount == 0 {
            return Err(Error::Currency(
                "amount to add must be greater than 0".to_string(),
            ));
        }

        debug!("Recharging {amount} credits for {transaction_id} ({source})");
        let request = RechargeRequest {
            amount,
            transaction_id: transaction_id.to_string(),
            source: source.to_string(),
        };
        self.ledger.recharge(&request).await.map_err(|e| {
            warn!("Recharge of {amount} credits failed: {e}");
            e
        })
    }

    /// Spend `amount` credits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Currency`] if `amount` is zero, or the ledger error.
    pub async fn consume_balance(&self, amount: u64, reason: &str) -> Result<serde_json::Value> {
        if amount == 0 {
            return Err(Error::Currency(
                "amount to consume must be greater than 0".to_string(),
            ));
        }

        debug!("Deducting {amount} credits: {reason}");
        let request = DeductRequest {
            amount,
            reason: reason.to_string(),
        };
        self.ledger.deduct(&request).await.map_err(|e| {
            warn!("Deduction of {amount} credits failed: {e}");
            e
        })
    }

    /// Whether the balance covers `amount`.
    pub async fn has_enough_balance(&self, amount: u64) -> bool {
        self.balance().await >= amount
    }
}
