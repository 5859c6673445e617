//! Application backend client.
//!
//! Routes live under `<base_url>/api`: authentication, memo CRUD and the
//! credit ledger. The health check sits at `<base_url>/health`.

mod client;
mod token;
mod types;

pub use client::ApiClient;
pub use token::{MemoryTokenStore, TokenStore};
pub use types::{
    ApiEnvelope, BalancePayload, DeductRequest, MemoPage, MemoQuery, RechargeRequest,
    API_SUCCESS_CODE,
};
