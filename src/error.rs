//! Error types for mjapp-client.

use crate::receipt::VerificationFailure;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client library.
///
/// Receipt verification reports its outcome as a [`VerificationFailure`]
/// value; it only becomes an [`Error`] when a caller (such as the purchase
/// flow) needs to abort on it.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with an unexpected HTTP status.
    #[error("HTTP error {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message reported by the backend, or a generic description.
        message: String,
    },

    /// The backend answered 200 but rejected the operation.
    #[error("API error {code}: {message}")]
    Api {
        /// Business code from the response envelope.
        code: i64,
        /// Message from the response envelope.
        message: String,
    },

    /// The stored session token was rejected.
    #[error("session expired, please log in again")]
    Unauthorized,

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid credit operation.
    #[error("currency error: {0}")]
    Currency(String),

    /// Memo capacity exhausted or expansion refused.
    #[error("memo limit: {0}")]
    MemoLimit(String),

    /// The in-app purchase flow failed.
    #[error("purchase error: {0}")]
    Purchase(String),

    /// A purchase receipt did not verify.
    #[error("receipt verification failed: {0}")]
    Receipt(#[from] VerificationFailure),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
