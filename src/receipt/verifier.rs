//! Receipt verification orchestrator.
//!
//! Combines the result cache, in-flight de-duplication, sandbox/production
//! fallback and bounded transport retry around a [`ReceiptTransport`].

use super::cache::{CacheStats, VerificationCache};
use super::interpret::ResponseInterpreter;
use super::status::is_environment_mismatch;
use super::transport::{HttpTransport, RawResponse, ReceiptTransport, TransportError, VerifyRequest};
use super::types::{
    Environment, ReceiptData, ReceiptKey, VerificationFailure, VerificationResult,
};
use crate::config::ReceiptConfig;
use crate::error::Result;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type PendingVerification = Shared<BoxFuture<'static, VerificationResult>>;

/// Where a verification run stands.
///
/// A run starts in `Initial`; an environment-mismatch status moves it to
/// `Fallback` against the other endpoint, where mismatch statuses are no
/// longer intercepted. That caps the run at one flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Initial(Environment),
    Fallback(Environment),
}

impl Stage {
    fn environment(self) -> Environment {
        match self {
            Self::Initial(env) | Self::Fallback(env) => env,
        }
    }
}

struct VerifierState {
    cache: VerificationCache,
    in_flight: HashMap<ReceiptKey, PendingVerification>,
}

struct Inner {
    config: ReceiptConfig,
    transport: Arc<dyn ReceiptTransport>,
    interpreter: ResponseInterpreter,
    state: Mutex<VerifierState>,
}

/// Verifies App Store receipts.
///
/// Cloning is cheap and clones share the cache and in-flight table, so one
/// verifier is built at startup and handed to every caller.
#[derive(Clone)]
pub struct ReceiptVerifier {
    inner: Arc<Inner>,
}

impl ReceiptVerifier {
    /// Create a verifier that talks to the configured endpoints over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns an error if the shared secret or bundle id is missing.
    pub fn new(config: ReceiptConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.timeout()));
        Self::with_transport(config, transport)
    }

    /// Create a verifier over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the shared secret or bundle id is missing.
    pub fn with_transport(
        config: ReceiptConfig,
        transport: Arc<dyn ReceiptTransport>,
    ) -> Result<Self> {
        config.validate()?;

        info!(
            "Receipt verifier initialized (bundle_id={}, max_retries={}, cache_ttl={}ms)",
            config.bundle_id, config.max_retries, config.cache_ttl_ms
        );

        Ok(Self {
            inner: Arc::new(Inner {
                interpreter: ResponseInterpreter::new(config.bundle_id.clone()),
                state: Mutex::new(VerifierState {
                    cache: VerificationCache::with_ttl(config.cache_ttl()),
                    in_flight: HashMap::new(),
                }),
                transport,
                config,
            }),
        })
    }

    /// Verify a receipt, starting at the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`VerificationFailure`] describing why the receipt was not
    /// accepted.
    pub async fn verify(&self, receipt: &ReceiptData) -> VerificationResult {
        self.verify_in(receipt, Environment::Production).await
    }

    /// Verify a receipt, starting at the given environment.
    ///
    /// 1. A fresh cached result for the same receipt bytes is returned as is
    /// 2. If the same receipt is already being verified, its result is shared
    /// 3. Otherwise a new verification runs and its result is cached
    ///
    /// # Errors
    ///
    /// Returns a [`VerificationFailure`] describing why the receipt was not
    /// accepted.
    pub async fn verify_in(
        &self,
        receipt: &ReceiptData,
        environment: Environment,
    ) -> VerificationResult {
        let key = receipt.content_hash();

        let pending = {
            let mut state = self.inner.state.lock();

            if let Some(result) = state.cache.get_fresh(&key, Instant::now()) {
                debug!("Receipt {} answered from cache", short_key(&key));
                return result;
            }

            if let Some(pending) = state.in_flight.get(&key) {
                debug!("Receipt {} already in flight, joining", short_key(&key));
                pending.clone()
            } else {
                let pending = Arc::clone(&self.inner)
                    .run_and_record(key, receipt.clone(), environment)
                    .boxed()
                    .shared();
                state.in_flight.insert(key, pending.clone());
                pending
            }
        };

        pending.await
    }

    /// Cache and in-flight counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            in_flight: state.in_flight.len(),
            ..state.cache.stats()
        }
    }

    /// Drop all cached results. Running verifications are unaffected.
    pub fn clear_cache(&self) {
        self.inner.state.lock().cache.clear();
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ReceiptConfig {
        &self.inner.config
    }
}

impl Inner {
    /// Body of the shared future: runs once per in-flight key, then records
    /// the outcome and retires the in-flight entry under one lock.
    async fn run_and_record(
        self: Arc<Self>,
        key: ReceiptKey,
        receipt: ReceiptData,
        environment: Environment,
    ) -> VerificationResult {
        let result = self.run(&receipt, environment).await;

        match &result {
            Ok(verified) => info!(
                "Receipt {} verified ({} transactions, {})",
                short_key(&key),
                verified.transactions.len(),
                verified.environment
            ),
            Err(failure) => warn!(
                "Receipt {} failed verification: {}",
                short_key(&key),
                failure
            ),
        }

        let mut state = self.state.lock();
        state.cache.insert(key, result.clone(), Instant::now());
        state.in_flight.remove(&key);
        result
    }

    async fn run(&self, receipt: &ReceiptData, environment: Environment) -> VerificationResult {
        let mut stage = Stage::Initial(environment);

        loop {
            let env = stage.environment();
            let response = self
                .post_with_retry(receipt, env)
                .await
                .map_err(|e| VerificationFailure::transport(&e))?;

            match (stage, response.status()) {
                (Stage::Initial(sent_to), Some(status)) if is_environment_mismatch(status, sent_to) => {
                    let target = sent_to.flipped();
                    info!("Receipt sent to {sent_to} belongs to {target}, retrying there");
                    stage = Stage::Fallback(target);
                }
                _ => return self.interpreter.interpret(&response, Utc::now()),
            }
        }
    }

    /// POST with up to `max_retries` attempts; attempt `n` is followed by a
    /// wait of `n * retry_delay`. Only transport failures are retried.
    async fn post_with_retry(
        &self,
        receipt: &ReceiptData,
        environment: Environment,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = self.url(environment);
        let request = VerifyRequest {
            receipt_data: receipt.as_text().into_owned(),
            password: self.config.shared_secret.clone(),
            exclude_old_transactions: self.config.exclude_old_transactions,
        };
        let max_attempts = self.config.max_retries.max(1);

        let mut attempt = 1;
        loop {
            match self.transport.post(url, &request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < max_attempts => {
                    warn!("Verification attempt {attempt}/{max_attempts} against {environment} failed: {e}");
                    tokio::time::sleep(self.config.retry_delay() * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Verification against {environment} gave up after {attempt} attempts: {e}");
                    return Err(e);
                }
            }
        }
    }

    fn url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.config.production_url,
            Environment::Sandbox => &self.config.sandbox_url,
        }
    }
}

fn short_key(key: &ReceiptKey) -> String {
    hex::encode(&key[..8])
}
