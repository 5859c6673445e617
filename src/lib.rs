//! # mjapp-client
//!
//! Client core for the mjapp note-taking app.
//!
//! ## Overview
//!
//! - [`api`]: backend client with bearer-token sessions
//! - [`currency`]: compute-credit balance over the backend ledger
//! - [`memo_limit`]: free memo quota and paid capacity expansion
//! - [`iap`]: in-app purchase of credit packs
//! - [`receipt`]: App Store receipt verification with caching, in-flight
//!   deduplication, environment fallback and retries
//!
//! Host applications observe the client through [`event::ClientEvent`]s
//! rather than UI callbacks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mjapp_client::config::ReceiptConfig;
//! use mjapp_client::receipt::{ReceiptData, ReceiptVerifier, TransactionMatcher};
//!
//! let verifier = ReceiptVerifier::new(ReceiptConfig {
//!     shared_secret: "secret".into(),
//!     bundle_id: "com.yourcompany.mjapp".into(),
//!     ..ReceiptConfig::default()
//! })?;
//! let matcher = TransactionMatcher::new(verifier);
//! let matched = matcher
//!     .match_transaction(&ReceiptData::from(receipt_b64), "1000000001", "mjapp.currency.6")
//!     .await?;
//! ```

pub mod api;
pub mod config;
pub mod currency;
pub mod error;
pub mod event;
pub mod iap;
pub mod memo_limit;
pub mod receipt;

pub use api::{ApiClient, MemoryTokenStore, TokenStore};
pub use config::ClientConfig;
pub use currency::{CurrencyLedger, CurrencyManager};
pub use error::{Error, Result};
pub use event::{create_event_channel, ClientEvent, ClientEventsChannel, ClientEventsSender};
pub use iap::{IapManager, PurchaseBridge};
pub use memo_limit::{ExpandOutcome, MemoCounter, MemoLimitStatus, MemoLimiter};
pub use receipt::{
    Environment, ReceiptData, ReceiptVerifier, TransactionMatcher, VerificationFailure,
    VerificationResult, VerifiedReceipt,
};
