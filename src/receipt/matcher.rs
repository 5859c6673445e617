//! Transaction lookup within a verified receipt.
//!
//! Consumable purchases are expected to be validated shortly after they are
//! made, so a matched transaction older than the allowed age is rejected.

use super::types::{
    FailureCode, ReceiptData, Transaction, TransactionMatch, TransactionResult,
    VerificationFailure, VerifiedReceipt,
};
use super::verifier::ReceiptVerifier;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// Default maximum age of a matched transaction.
pub const DEFAULT_MAX_TRANSACTION_AGE: TimeDelta = TimeDelta::hours(24);

/// Finds one transaction in a verified receipt.
#[derive(Clone)]
pub struct TransactionMatcher {
    verifier: ReceiptVerifier,
    max_age: TimeDelta,
}

impl TransactionMatcher {
    /// Create a matcher with the default 24 hour window.
    #[must_use]
    pub fn new(verifier: ReceiptVerifier) -> Self {
        Self::with_max_age(verifier, DEFAULT_MAX_TRANSACTION_AGE)
    }

    /// Create a matcher with a custom window.
    #[must_use]
    pub fn with_max_age(verifier: ReceiptVerifier, max_age: TimeDelta) -> Self {
        Self { verifier, max_age }
    }

    /// Verify `receipt` and find the transaction with both ids.
    ///
    /// # Errors
    ///
    /// Returns the verification failure unchanged, or
    /// `TRANSACTION_NOT_FOUND` / `TRANSACTION_EXPIRED`.
    pub async fn match_transaction(
        &self,
        receipt: &ReceiptData,
        transaction_id: &str,
        product_id: &str,
    ) -> TransactionResult {
        let verified = self.verifier.verify(receipt).await?;
        find_transaction(verified, transaction_id, product_id, Utc::now(), self.max_age)
    }
}

/// Look up a transaction in an already verified receipt as of `now`.
///
/// # Errors
///
/// Returns `TRANSACTION_NOT_FOUND` when no entry matches both ids, or
/// `TRANSACTION_EXPIRED` with the computed age when it is older than `max_age`.
pub fn find_transaction(
    receipt: VerifiedReceipt,
    transaction_id: &str,
    product_id: &str,
    now: DateTime<Utc>,
    max_age: TimeDelta,
) -> TransactionResult {
    let transaction: Transaction = receipt
        .transactions
        .iter()
        .find(|t| t.transaction_id == transaction_id && t.product_id == product_id)
        .cloned()
        .ok_or_else(|| {
            debug!("Transaction {transaction_id} for {product_id} not in receipt");
            VerificationFailure::new(
                FailureCode::TransactionNotFound,
                "transaction not found in receipt",
            )
        })?;

    let age = now.signed_duration_since(transaction.purchase_date);
    if age > max_age {
        return Err(VerificationFailure::new(
            FailureCode::TransactionExpired { age },
            format!(
                "transaction {} is {}h old",
                transaction.transaction_id,
                age.num_hours()
            ),
        ));
    }

    Ok(TransactionMatch {
        transaction,
        receipt,
    })
}
