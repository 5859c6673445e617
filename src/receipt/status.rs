//! App Store `verifyReceipt` status codes.

use super::types::Environment;

/// The receipt is valid.
pub const STATUS_VALID: i64 = 0;

/// A sandbox receipt was sent to the production endpoint.
pub const STATUS_SANDBOX_RECEIPT_IN_PRODUCTION: i64 = 21007;

/// A production receipt was sent to the sandbox endpoint.
pub const STATUS_PRODUCTION_RECEIPT_IN_SANDBOX: i64 = 21008;

/// Message for codes missing from the table.
pub const UNKNOWN_STATUS_MESSAGE: &str = "unknown error";

const STATUS_MESSAGES: &[(i64, &str)] = &[
    (0, "receipt is valid"),
    (21000, "receipt data is malformed"),
    (21002, "receipt data is malformed"),
    (21003, "receipt could not be authenticated"),
    (21004, "shared secret does not match"),
    (21005, "receipt server is temporarily unavailable"),
    (21006, "receipt is valid but the subscription has expired"),
    (21007, "sandbox receipt was sent to the production environment"),
    (21008, "production receipt was sent to the sandbox environment"),
    (21009, "internal data access error"),
    (21010, "user account cannot be found or has been deleted"),
];

/// Documented message for a status code, if any.
#[must_use]
pub fn known_status_message(status: i64) -> Option<&'static str> {
    STATUS_MESSAGES
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, message)| *message)
}

/// Human-readable message for a status code.
#[must_use]
pub fn status_message(status: i64) -> &'static str {
    known_status_message(status).unwrap_or(UNKNOWN_STATUS_MESSAGE)
}

/// The status says a receipt sent to `sent_to` belongs to the other
/// environment.
#[must_use]
pub fn is_environment_mismatch(status: i64, sent_to: Environment) -> bool {
    if sent_to.is_production() {
        status == STATUS_SANDBOX_RECEIPT_IN_PRODUCTION
    } else {
        status == STATUS_PRODUCTION_RECEIPT_IN_SANDBOX
    }
}
