//! Memo capacity limits.
//!
//! Users get a fixed number of free memos. Creating past that limit requires
//! expanding capacity, which spends credits through the [`CurrencyManager`].
//! Memo counts come from the backend and are never tracked locally.

use crate::api::{ApiClient, MemoPage, MemoQuery};
use crate::currency::{CurrencyLedger, CurrencyManager};
use crate::error::{Error, Result};
use crate::event::{ClientEvent, ClientEventsSender};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Source of the user's memo total.
#[async_trait]
pub trait MemoCounter: Send + Sync {
    /// Number of memos the user owns.
    async fn memo_count(&self) -> Result<u64>;
}

#[async_trait]
impl MemoCounter for ApiClient {
    async fn memo_count(&self) -> Result<u64> {
        let query = MemoQuery {
            page: 1,
            limit: 1,
            keyword: None,
        };
        Ok(self.list_memos(&query).await?.data::<MemoPage>()?.total)
    }
}

#[async_trait]
impl<T: MemoCounter + ?Sized> MemoCounter for Arc<T> {
    async fn memo_count(&self) -> Result<u64> {
        (**self).memo_count().await
    }
}

/// Counts after a create or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoCounts {
    /// Memo count after the operation.
    pub current_count: u64,
    /// Slots left before the limit.
    pub remaining_capacity: u64,
}

/// Result of a capacity expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ExpandOutcome {
    /// Credits were spent.
    #[serde(rename_all = "camelCase")]
    Expanded {
        /// Slots added.
        amount: u64,
        /// Capacity after expansion.
        new_capacity: u64,
        /// Balance after spending.
        remaining_balance: u64,
    },
    /// The balance does not cover the expansion.
    #[serde(rename_all = "camelCase")]
    Insufficient {
        /// Credits needed.
        required: u64,
        /// Credits available.
        balance: u64,
    },
}

impl ExpandOutcome {
    /// Whether capacity was expanded.
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        matches!(self, Self::Expanded { .. })
    }
}

impl fmt::Display for ExpandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expanded { amount, .. } => write!(f, "expanded memo capacity by {amount}"),
            Self::Insufficient { required, balance } => write!(
                f,
                "insufficient credits: {required} required, balance is {balance}"
            ),
        }
    }
}

/// Snapshot of the user's memo limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoLimitStatus {
    /// Memos owned.
    pub current_memo_count: u64,
    /// Capacity ceiling.
    pub current_capacity: u64,
    /// Always 0; expansions are not tracked as persistent capacity.
    pub expanded_capacity: u64,
    /// Slots left.
    pub remaining_capacity: u64,
    /// Whether a memo can be created without expanding.
    pub can_create_memo: bool,
    /// Whether the free quota is used up.
    pub needs_currency_to_create: bool,
    /// Free memo quota.
    pub free_limit: u64,
    /// Credits per extra slot.
    pub expansion_cost: u64,
    /// Current credit balance.
    pub currency_balance: u64,
}

/// Enforces the memo limit.
pub struct MemoLimiter<C, L> {
    counter: C,
    currency: CurrencyManager<L>,
    events: ClientEventsSender,
}

impl<C: MemoCounter, L: CurrencyLedger> MemoLimiter<C, L> {
    /// Create a limiter.
    #[must_use]
    pub fn new(counter: C, currency: CurrencyManager<L>, events: ClientEventsSender) -> Self {
        Self {
            counter,
            currency,
            events,
        }
    }

    /// Memo count from the backend, 0 if it cannot be fetched.
    pub async fn current_memo_count(&self) -> u64 {
        match self.counter.memo_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to fetch memo count: {e}");
                0
            }
        }
    }

    /// Capacity ceiling. Only the free limit applies.
    #[must_use]
    pub fn current_capacity(&self) -> u64 {
        self.currency.config().free_memo_limit
    }

    /// Slots left before the limit.
    pub async fn remaining_capacity(&self) -> u64 {
        self.current_capacity()
            .saturating_sub(self.current_memo_count().await)
    }

    /// Whether a memo can be created without expanding.
    pub async fn can_create_memo(&self) -> bool {
        self.remaining_capacity().await > 0
    }

    /// Whether the free quota is used up.
    pub async fn needs_currency_to_create(&self) -> bool {
        self.current_memo_count().await >= self.currency.config().free_memo_limit
    }

    /// Check the limit before creating a memo, expanding by one slot when
    /// `force_expand` is set and the limit is reached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemoLimit`] when the limit is reached and expansion
    /// was not requested or could not be paid for.
    pub async fn create_memo(&self, force_expand: bool) -> Result<MemoCounts> {
        let count = self.current_memo_count().await;
        let capacity = self.current_capacity();

        if count >= capacity {
            if !force_expand {
                return Err(Error::MemoLimit(
                    "memo limit reached, capacity must be expanded".to_string(),
                ));
            }
            let outcome = self.expand_capacity(1).await?;
            if !outcome.is_expanded() {
                return Err(Error::MemoLimit(outcome.to_string()));
            }
        }

        let current_count = count + 1;
        Ok(MemoCounts {
            current_count,
            remaining_capacity: self.current_capacity().saturating_sub(current_count),
        })
    }

    /// Counts after a memo is deleted.
    pub async fn delete_memo(&self) -> MemoCounts {
        let current_count = self.current_memo_count().await.saturating_sub(1);
        MemoCounts {
            current_count,
            remaining_capacity: self.current_capacity().saturating_sub(current_count),
        }
    }

    /// Spend credits to expand capacity by `amount` slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemoLimit`] for a zero amount, or the ledger error if
    /// the deduction fails.
    pub async fn expand_capacity(&self, amount: u64) -> Result<ExpandOutcome> {
        if amount == 0 {
            return Err(Error::MemoLimit(
                "expansion amount must be greater than 0".to_string(),
            ));
        }

        let required = amount.saturating_mul(self.currency.config().memo_expansion_cost);
        let balance = self.currency.balance().await;
        if balance < required {
            return Ok(ExpandOutcome::Insufficient { required, balance });
        }

        self.currency
            .consume_balance(required, &format!("expand memo capacity by {amount}"))
            .await?;

        let _ = self.events.send(ClientEvent::CapacityExpanded { amount });
        Ok(ExpandOutcome::Expanded {
            amount,
            new_capacity: self.current_capacity(),
            remaining_balance: self.currency.balance().await,
        })
    }

    /// Current limit status.
    pub async fn status(&self) -> MemoLimitStatus {
        let config = self.currency.config();
        let count = self.current_memo_count().await;
        let capacity = self.current_capacity();
        let remaining = capacity.saturating_sub(count);

        MemoLimitStatus {
            current_memo_count: count,
            current_capacity: capacity,
            expanded_capacity: 0,
            remaining_capacity: remaining,
            can_create_memo: remaining > 0,
            needs_currency_to_create: count >= config.free_memo_limit,
            free_limit: config.free_memo_limit,
            expansion_cost: config.memo_expansion_cost,
            currency_balance: self.currency.balance().await,
        }
    }

    /// Refresh the memo count from the backend.
    pub async fn sync_memo_count(&self) -> u64 {
        let count = self.current_memo_count().await;
        info!("Synced memo count: {count}");
        count
    }

    /// `"<count>/<capacity> memos"`.
    #[must_use]
    pub fn format_capacity_info(&self, status: &MemoLimitStatus) -> String {
        format!(
            "{}/{} memos",
            status.current_memo_count, status.current_capacity
        )
    }

    /// Hint shown next to the create button.
    #[must_use]
    pub fn limit_message(&self, status: &MemoLimitStatus) -> String {
        if !status.can_create_memo {
            return format!(
                "Limit reached, expanding capacity costs {} {}",
                status.expansion_cost,
                self.currency.config().currency_name
            );
        }
        if status.needs_currency_to_create {
            format!("{} more memos can be created", status.remaining_capacity)
        } else {
            let free_left = status
                .free_limit
                .saturating_sub(status.current_memo_count)
                .min(status.remaining_capacity);
            format!("{free_left} free memos left")
        }
    }
}
