//! App Store receipt verification.
//!
//! # Architecture
//!
//! ```text
//! verify(receipt)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ Check result cache  │
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//!  FRESH         MISS
//!    │             │
//!    ▼             ▼
//! Return     ┌─────────────────────┐
//!            │ Already in flight?  │──YES──► await shared result
//!            └─────────┬───────────┘
//!                      │ NO
//!                      ▼
//!            POST (≤3 attempts, 1s·n backoff)
//!                      │
//!            ┌─────────┴─────────┐
//!            │                   │
//!      21007 / 21008         any other status
//!            │                   │
//!            ▼                   ▼
//!   POST other environment    interpret
//!     (once, no flip back)       │
//!            │                   │
//!            └─────────┬─────────┘
//!                      ▼
//!            cache result, clear in-flight
//! ```
//!
//! [`TransactionMatcher`] builds on the verifier to locate one purchase in a
//! receipt and reject purchases older than 24 hours.

mod cache;
mod interpret;
mod matcher;
pub mod status;
mod transport;
mod types;
mod util;
mod verifier;

pub use cache::{CacheStats, VerificationCache, DEFAULT_CACHE_TTL};
pub use interpret::ResponseInterpreter;
pub use matcher::{find_transaction, TransactionMatcher, DEFAULT_MAX_TRANSACTION_AGE};
pub use transport::{HttpTransport, RawResponse, ReceiptTransport, TransportError, VerifyRequest};
pub use types::{
    Environment, FailureCode, ReceiptData, ReceiptKey, Transaction, TransactionMatch,
    TransactionResult, VerificationFailure, VerificationResult, VerifiedReceipt,
};
pub use util::{format_verification_error, is_valid_receipt_data};
pub use verifier::ReceiptVerifier;

#[cfg(test)]
pub(crate) use verifier::tests as verifier_tests;
