//! Receipt helpers for callers outside the verification flow.

use super::status::known_status_message;
use super::types::{FailureCode, VerificationFailure};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Whether `receipt` is non-empty canonical base64.
///
/// Canonical means decoding and re-encoding yields the same text, so padding
/// and alphabet must be exact.
#[must_use]
pub fn is_valid_receipt_data(receipt: &str) -> bool {
    if receipt.is_empty() {
        return false;
    }
    STANDARD
        .decode(receipt)
        .map(|decoded| STANDARD.encode(decoded) == receipt)
        .unwrap_or(false)
}

/// One-line description of a failure for display.
///
/// Endpoint statuses read as `"<message> (<status>)"` using the status table;
/// everything else uses the failure's own message.
#[must_use]
pub fn format_verification_error(failure: &VerificationFailure) -> String {
    if let FailureCode::Status(status) = failure.code {
        if let Some(message) = known_status_message(status) {
            return format!("{message} ({status})");
        }
    }
    if failure.error.is_empty() {
        "unknown verification error".to_string()
    } else {
        failure.error.clone()
    }
}
