//! Response interpretation and transaction extraction.

use super::status::{status_message, STATUS_VALID};
use super::transport::RawResponse;
use super::types::{
    Environment, FailureCode, Transaction, VerificationFailure, VerificationResult,
    VerifiedReceipt,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// Text form of a receipt field. Apple sends strings, but numbers and
/// booleans are read the same way.
fn field_text(entry: &Value, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Maps validation endpoint responses to verification results.
#[derive(Debug, Clone)]
pub struct ResponseInterpreter {
    bundle_id: String,
}

impl ResponseInterpreter {
    /// Create an interpreter that accepts receipts for `bundle_id`.
    #[must_use]
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
        }
    }

    /// Interpret a response received at `verified_at`.
    ///
    /// Environment-mismatch statuses are handled by the verifier before this
    /// is called; if one arrives here it is reported like any other status.
    ///
    /// # Errors
    ///
    /// Returns a [`VerificationFailure`] for a non-zero status, a missing
    /// receipt, a bundle id mismatch, or a body without a status.
    pub fn interpret(
        &self,
        response: &RawResponse,
        verified_at: DateTime<Utc>,
    ) -> VerificationResult {
        let Some(status) = response.status() else {
            return Err(VerificationFailure::new(
                FailureCode::VerificationError,
                "response has no status field",
            )
            .with_response(response.body().clone()));
        };

        if status != STATUS_VALID {
            debug!("Receipt rejected with status {status}");
            return Err(
                VerificationFailure::new(FailureCode::Status(status), status_message(status))
                    .with_response(response.body().clone()),
            );
        }

        let receipt_value = match response.body().get("receipt") {
            Some(value) if !value.is_null() => value.clone(),
            _ => {
                return Err(VerificationFailure::new(
                    FailureCode::EmptyReceipt,
                    "receipt data is empty",
                ))
            }
        };

        let actual = field_text(&receipt_value, "bundle_id").unwrap_or_default();
        if actual != self.bundle_id {
            warn!(
                "Bundle id mismatch: expected {}, got {}",
                self.bundle_id, actual
            );
            return Err(VerificationFailure::new(
                FailureCode::BundleIdMismatch {
                    expected: self.bundle_id.clone(),
                    actual,
                },
                "bundle id mismatch",
            ));
        }

        let environment = response
            .body()
            .get("environment")
            .and_then(|v| serde_json::from_value::<Environment>(v.clone()).ok())
            .unwrap_or_default();

        Ok(VerifiedReceipt {
            bundle_id: actual,
            transactions: extract_transactions(&receipt_value),
            environment,
            verification_time: verified_at,
            receipt: receipt_value,
        })
    }
}

/// Transactions from `in_app`; a missing or null list reads as empty.
fn extract_transactions(receipt: &Value) -> Vec<Transaction> {
    let Some(in_app) = receipt.get("in_app").and_then(Value::as_array) else {
        return Vec::new();
    };
    in_app
        .iter()
        .map(|entry| Transaction {
            transaction_id: field_text(entry, "transaction_id").unwrap_or_default(),
            original_transaction_id: field_text(entry, "original_transaction_id")
                .unwrap_or_default(),
            product_id: field_text(entry, "product_id").unwrap_or_default(),
            purchase_date: parse_purchase_date(field_text(entry, "purchase_date_ms").as_deref()),
            quantity: parse_quantity(field_text(entry, "quantity").as_deref()),
            is_trial_period: parse_flag(field_text(entry, "is_trial_period").as_deref()),
            is_intro_offer_period: parse_flag(
                field_text(entry, "is_in_intro_offer_period").as_deref(),
            ),
        })
        .collect()
}

/// Millisecond epoch string to an instant. Unparseable values map to the
/// epoch, which any age check treats as long expired.
pub(crate) fn parse_purchase_date(ms: Option<&str>) -> DateTime<Utc> {
    ms.and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

/// Leading decimal digits of `raw`; 1 when there are none or they read 0.
pub(crate) fn parse_quantity(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return 1;
    };
    let trimmed = raw.trim_start();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed, |end| &trimmed[..end]);
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => 1,
        Ok(n) => n,
    }
}

pub(crate) fn parse_flag(raw: Option<&str>) -> bool {
    raw == Some("true")
}
