//! HTTP requestor for the receipt validation endpoint.
//!
//! One POST per call. Retrying is the verifier's job.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Transport-level failure. These are the only failures that get retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response within the deadline.
    #[error("verification request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection or protocol failure.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-200 status.
    #[error("HTTP error: {0}")]
    Http(u16),
}

/// JSON body of a `verifyReceipt` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyRequest {
    /// Base64 receipt.
    #[serde(rename = "receipt-data")]
    pub receipt_data: String,
    /// Shared secret.
    pub password: String,
    /// Only return the latest renewal of each subscription.
    #[serde(rename = "exclude-old-transactions")]
    pub exclude_old_transactions: bool,
}

/// Decoded body of a 200 response.
///
/// Bodies that are not JSON decode to `Value::Null`, which the interpreter
/// reports as an unreadable response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    body: serde_json::Value,
}

impl RawResponse {
    /// Wrap a decoded body.
    #[must_use]
    pub fn new(body: serde_json::Value) -> Self {
        Self { body }
    }

    /// Decode a body, falling back to `Null` for non-JSON content.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(serde_json::from_slice(bytes).unwrap_or(serde_json::Value::Null))
    }

    /// The `status` field.
    #[must_use]
    pub fn status(&self) -> Option<i64> {
        self.body.get("status").and_then(serde_json::Value::as_i64)
    }

    /// The whole body.
    #[must_use]
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }
}

/// Request/response channel to a validation endpoint.
#[async_trait]
pub trait ReceiptTransport: Send + Sync {
    /// POST `request` to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on timeout, connection failure, or a
    /// non-200 status.
    async fn post(
        &self,
        url: &str,
        request: &VerifyRequest,
    ) -> Result<RawResponse, TransportError>;
}

/// [`ReceiptTransport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the given per-request deadline.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    /// Use an existing `reqwest` client (connection pool, proxy settings).
    #[must_use]
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn exchange(
        &self,
        url: &str,
        request: &VerifyRequest,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::Http(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.classify(&e))?;
        Ok(RawResponse::from_slice(&body))
    }

    fn classify(&self, e: &reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl ReceiptTransport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        request: &VerifyRequest,
    ) -> Result<RawResponse, TransportError> {
        debug!("POST {url}");
        // The deadline covers connect, send and body download.
        tokio::time::timeout(self.timeout, self.exchange(url, request))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}
