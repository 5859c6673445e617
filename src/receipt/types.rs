//! Receipt verification data types.

use super::transport::TransportError;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt;

/// Cache identity of a receipt - SHA-256 of its content.
pub type ReceiptKey = [u8; 32];

/// Outcome of a receipt verification.
pub type VerificationResult = Result<VerifiedReceipt, VerificationFailure>;

/// Outcome of a transaction lookup.
pub type TransactionResult = Result<TransactionMatch, VerificationFailure>;

/// Opaque receipt blob as delivered by the purchase platform.
///
/// Usually base64 text. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptData(Bytes);

impl ReceiptData {
    /// Wrap raw receipt bytes.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Receipt as text for the `receipt-data` request field.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Content hash used as the cache key.
    #[must_use]
    pub fn content_hash(&self) -> ReceiptKey {
        Sha256::digest(&self.0).into()
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the receipt is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ReceiptData {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<&str> for ReceiptData {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Vec<u8>> for ReceiptData {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

/// Validation environment.
///
/// Serialized the way the validation endpoint reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Environment {
    /// Live App Store purchases.
    #[default]
    Production,
    /// TestFlight and development purchases.
    Sandbox,
}

impl Environment {
    /// The other environment.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Production => Self::Sandbox,
            Self::Sandbox => Self::Production,
        }
    }

    /// `true` for [`Environment::Production`].
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Sandbox => f.write_str("sandbox"),
        }
    }
}

/// One in-app purchase from a verified receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Platform transaction identifier.
    pub transaction_id: String,
    /// Identifier of the first transaction in a renewal chain.
    pub original_transaction_id: String,
    /// Purchased product.
    pub product_id: String,
    /// When the purchase was made.
    pub purchase_date: DateTime<Utc>,
    /// Units purchased, at least 1.
    pub quantity: u32,
    /// Purchased during a free trial.
    pub is_trial_period: bool,
    /// Purchased during an introductory offer.
    pub is_intro_offer_period: bool,
}

/// A receipt that passed verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedReceipt {
    /// Bundle identifier the receipt was issued for.
    pub bundle_id: String,
    /// In-app purchases contained in the receipt.
    pub transactions: Vec<Transaction>,
    /// Environment that accepted the receipt.
    pub environment: Environment,
    /// When verification completed.
    pub verification_time: DateTime<Utc>,
    /// The `receipt` object as returned by the endpoint.
    pub receipt: serde_json::Value,
}

/// Successful transaction lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMatch {
    /// The matched purchase.
    pub transaction: Transaction,
    /// Receipt context, including the environment.
    pub receipt: VerifiedReceipt,
}

impl TransactionMatch {
    /// Environment that accepted the receipt.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.receipt.environment
    }
}

/// Reason a verification or lookup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCode {
    /// Non-zero status from the validation endpoint.
    Status(i64),
    /// Status 0 without a `receipt` object.
    EmptyReceipt,
    /// The receipt belongs to another app.
    BundleIdMismatch {
        /// Configured bundle id.
        expected: String,
        /// Bundle id found in the receipt.
        actual: String,
    },
    /// No transaction with the requested ids.
    TransactionNotFound,
    /// The transaction is older than the allowed window.
    TransactionExpired {
        /// Time since purchase.
        age: TimeDelta,
    },
    /// The request timed out on every attempt.
    Timeout,
    /// The request failed on every attempt.
    NetworkError,
    /// The endpoint answered with a non-200 HTTP status on every attempt.
    HttpError(u16),
    /// Anything else, e.g. an unreadable response.
    VerificationError,
}

impl FailureCode {
    /// Symbolic code, or the numeric status rendered as text.
    #[must_use]
    pub fn as_code(&self) -> Cow<'static, str> {
        match self {
            Self::Status(status) => Cow::Owned(status.to_string()),
            Self::EmptyReceipt => Cow::Borrowed("EMPTY_RECEIPT"),
            Self::BundleIdMismatch { .. } => Cow::Borrowed("BUNDLE_ID_MISMATCH"),
            Self::TransactionNotFound => Cow::Borrowed("TRANSACTION_NOT_FOUND"),
            Self::TransactionExpired { .. } => Cow::Borrowed("TRANSACTION_EXPIRED"),
            Self::Timeout => Cow::Borrowed("TIMEOUT"),
            Self::NetworkError => Cow::Borrowed("NETWORK_ERROR"),
            Self::HttpError(_) => Cow::Borrowed("HTTP_ERROR"),
            Self::VerificationError => Cow::Borrowed("VERIFICATION_ERROR"),
        }
    }

    /// Numeric endpoint status, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<i64> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_code())
    }
}

impl From<&TransportError> for FailureCode {
    fn from(e: &TransportError) -> Self {
        match e {
            TransportError::Timeout(_) => Self::Timeout,
            TransportError::Network(_) => Self::NetworkError,
            TransportError::Http(status) => Self::HttpError(*status),
        }
    }
}

// Flattened into the failure object: `code` plus the variant's details.
impl Serialize for FailureCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Status(status) => map.serialize_entry("code", status)?,
            other => map.serialize_entry("code", &other.as_code())?,
        }
        match self {
            Self::BundleIdMismatch { expected, actual } => {
                map.serialize_entry("expected", expected)?;
                map.serialize_entry("actual", actual)?;
            }
            Self::TransactionExpired { age } => {
                map.serialize_entry("transactionAge", &age.num_milliseconds())?;
            }
            Self::HttpError(status) => map.serialize_entry("httpStatus", status)?,
            _ => {}
        }
        map.end()
    }
}

/// A failed verification or transaction lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{error} ({code})")]
pub struct VerificationFailure {
    /// Human-readable reason.
    pub error: String,
    /// Machine-readable reason.
    #[serde(flatten)]
    pub code: FailureCode,
    /// Raw endpoint response, kept for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl VerificationFailure {
    /// Create a failure without an attached response.
    #[must_use]
    pub fn new(code: FailureCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            response: None,
        }
    }

    /// Failure after transport retries were exhausted.
    #[must_use]
    pub fn transport(error: &TransportError) -> Self {
        Self::new(FailureCode::from(error), error.to_string())
    }

    /// Attach the raw response.
    #[must_use]
    pub fn with_response(mut self, response: serde_json::Value) -> Self {
        self.response = Some(response);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_hash_is_stable() {
        let a = ReceiptData::from("MIIT0gYJKoZIhvcNAQcC");
        let b = ReceiptData::from("MIIT0gYJKoZIhvcNAQcC".to_string());
        let c = ReceiptData::from("MIIT0gYJKoZIhvcNAQcD");

        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_environment_flip() {
        assert_eq!(Environment::Production.flipped(), Environment::Sandbox);
        assert_eq!(Environment::Sandbox.flipped(), Environment::Production);
        assert_eq!(
            serde_json::to_value(Environment::Sandbox).unwrap(),
            json!("Sandbox")
        );
    }

    #[test]
    fn test_failure_serialization() {
        let failure = VerificationFailure::new(
            FailureCode::BundleIdMismatch {
                expected: "com.yourcompany.mjapp".to_string(),
                actual: "com.other.app".to_string(),
            },
            "bundle id mismatch",
        );
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["code"], "BUNDLE_ID_MISMATCH");
        assert_eq!(value["expected"], "com.yourcompany.mjapp");
        assert_eq!(value["actual"], "com.other.app");
        assert!(value.get("response").is_none());

        let status = VerificationFailure::new(FailureCode::Status(21003), "x")
            .with_response(json!({"status": 21003}));
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["code"], 21003);
        assert_eq!(value["response"]["status"], 21003);
    }

    #[test]
    fn test_transport_failure_codes() {
        let failure = VerificationFailure::transport(&TransportError::Http(503));
        assert_eq!(failure.code, FailureCode::HttpError(503));
        assert_eq!(failure.code.as_code(), "HTTP_ERROR");
        assert!(failure.code.status().is_none());
    }
}
