//! HTTP client for the application backend.

use super::token::TokenStore;
use super::types::{
    ApiEnvelope, BalancePayload, DeductRequest, MemoQuery, RechargeRequest,
    API_SUCCESS_CODE,
};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::event::{ClientEvent, ClientEventsSender};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_FAILURE_MESSAGE: &str = "Operation failed, please try again later";
const NETWORK_FAILURE_MESSAGE: &str = "Network connection failed, please check your network settings";

/// Client for the note-taking backend.
///
/// Attaches the stored bearer token to every request and unwraps the
/// `{ code, message, data }` envelope. A 401 clears the stored session and
/// emits [`ClientEvent::SessionExpired`]; other failures emit a
/// [`ClientEvent::Notice`] with the message to show.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_prefix: String,
    tokens: Arc<dyn TokenStore>,
    events: ClientEventsSender,
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &ApiConfig,
        tokens: Arc<dyn TokenStore>,
        events: ClientEventsSender,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_prefix: config.api_prefix.clone(),
            tokens,
            events,
        })
    }

    /// The session store in use.
    #[must_use]
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Backend health check.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn health(&self) -> Result<ApiEnvelope> {
        let url = format!("{}/health", self.base_url);
        self.send(Method::GET, url, &[], None::<&()>).await
    }

    /// Log in.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn login<B: Serialize + ?Sized + Sync>(&self, credentials: &B) -> Result<ApiEnvelope> {
        self.post("/auth/login", credentials).await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn register<B: Serialize + ?Sized + Sync>(&self, account: &B) -> Result<ApiEnvelope> {
        self.post("/auth/register", account).await
    }

    /// Request a password reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn forgot_password<B: Serialize + ?Sized + Sync>(
        &self,
        request: &B,
    ) -> Result<ApiEnvelope> {
        self.post("/auth/forgot-password", request).await
    }

    /// Reset the password with a code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn reset_password<B: Serialize + ?Sized + Sync>(
        &self,
        request: &B,
    ) -> Result<ApiEnvelope> {
        self.post("/auth/reset-password", request).await
    }

    /// List memos.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn list_memos(&self, query: &MemoQuery) -> Result<ApiEnvelope> {
        self.send(Method::GET, self.route("/memos"), &query.to_pairs(), None::<&()>)
            .await
    }

    /// Fetch one memo.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn get_memo(&self, id: &str) -> Result<ApiEnvelope> {
        self.send(Method::GET, self.route(&format!("/memos/{id}")), &[], None::<&()>)
            .await
    }

    /// Create a memo.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn create_memo<B: Serialize + ?Sized + Sync>(&self, memo: &B) -> Result<ApiEnvelope> {
        self.post("/memos", memo).await
    }

    /// Update a memo.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn update_memo<B: Serialize + ?Sized + Sync>(
        &self,
        id: &str,
        memo: &B,
    ) -> Result<ApiEnvelope> {
        self.send(Method::PUT, self.route(&format!("/memos/{id}")), &[], Some(memo))
            .await
    }

    /// Delete a memo.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn delete_memo(&self, id: &str) -> Result<ApiEnvelope> {
        self.send(Method::DELETE, self.route(&format!("/memos/{id}")), &[], None::<&()>)
            .await
    }

    /// Current credit balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is malformed.
    pub async fn currency_balance(&self) -> Result<u64> {
        let envelope = self
            .send(Method::GET, self.route("/currency/balance"), &[], None::<&()>)
            .await?;
        Ok(envelope.data::<BalancePayload>()?.balance)
    }

    /// Add credits after a purchase.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn currency_recharge(&self, request: &RechargeRequest) -> Result<ApiEnvelope> {
        self.post("/currency/recharge", request).await
    }

    /// Spend credits.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn currency_deduct(&self, request: &DeductRequest) -> Result<ApiEnvelope> {
        self.post("/currency/deduct", request).await
    }

    fn route(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    async fn post<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<ApiEnvelope> {
        self.send(Method::POST, self.route(path), &[], Some(body)).await
    }

    async fn send<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        url: String,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ApiEnvelope> {
        debug!("{method} {url}");

        let mut request = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request to {url} failed: {e}");
                self.notify(NETWORK_FAILURE_MESSAGE);
                return Err(Error::Network(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        self.handle_response(status, &body)
    }

    /// Unwrap an HTTP response into the envelope, applying session and
    /// notification side effects.
    fn handle_response(&self, status: u16, body: &[u8]) -> Result<ApiEnvelope> {
        match status {
            200 => {
                let envelope: ApiEnvelope = serde_json::from_slice(body)?;
                if envelope.code == API_SUCCESS_CODE {
                    Ok(envelope)
                } else {
                    let message = envelope
                        .message
                        .clone()
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                    self.notify(&message);
                    Err(Error::Api {
                        code: envelope.code,
                        message,
                    })
                }
            }
            401 => {
                warn!("Session rejected, clearing stored token");
                self.tokens.clear_session();
                let _ = self.events.send(ClientEvent::SessionExpired);
                Err(Error::Unauthorized)
            }
            _ => {
                let message = serde_json::from_slice::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("message")?.as_str().map(str::to_string))
                    .unwrap_or_else(|| format!("Unexpected server response ({status})"));
                self.notify(&message);
                Err(Error::Http { status, message })
            }
        }
    }

    fn notify(&self, message: &str) {
        let _ = self.events.send(ClientEvent::Notice {
            message: message.to_string(),
        });
    }
}
