//! Configuration for mjapp-client.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Production receipt validation endpoint.
pub const PRODUCTION_VERIFY_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";

/// Sandbox receipt validation endpoint.
pub const SANDBOX_VERIFY_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application backend settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Receipt verification settings.
    #[serde(default)]
    pub receipt: ReceiptConfig,

    /// Credit and memo capacity rules.
    #[serde(default)]
    pub currency: CurrencyConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Application backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend origin, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Prefix for versioned routes.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Request timeout in seconds.
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

/// Receipt verification configuration.
///
/// `shared_secret` and `bundle_id` have no usable defaults and must come from
/// deployment configuration; [`ReceiptConfig::validate`] rejects empty values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// Production validation endpoint.
    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// Sandbox validation endpoint.
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,

    /// App Store Connect shared secret.
    #[serde(default)]
    pub shared_secret: String,

    /// Expected bundle identifier of verified receipts.
    #[serde(default)]
    pub bundle_id: String,

    /// Attempts per environment before a transport failure is surfaced.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff unit in milliseconds; attempt `n` waits `n` units.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Lifetime of cached verification results in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Ask the validation endpoint to omit superseded renewals.
    #[serde(default = "default_true")]
    pub exclude_old_transactions: bool,
}

/// Credit pricing and memo capacity rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Credits granted per unit of local currency.
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: u64,

    /// Credits consumed per additional memo slot.
    #[serde(default = "default_expansion_cost")]
    pub memo_expansion_cost: u64,

    /// Memos available without spending credits.
    #[serde(default = "default_free_memo_limit")]
    pub free_memo_limit: u64,

    /// Display name of the credit unit.
    #[serde(default = "default_currency_name")]
    pub currency_name: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            production_url: default_production_url(),
            sandbox_url: default_sandbox_url(),
            shared_secret: String::new(),
            bundle_id: String::new(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            exclude_old_transactions: true,
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            exchange_rate: default_exchange_rate(),
            memo_expansion_cost: default_expansion_cost(),
            free_memo_limit: default_free_memo_limit(),
            currency_name: default_currency_name(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://mjbackend.vic0.com".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

const fn default_api_timeout() -> u64 {
    30
}

fn default_production_url() -> String {
    PRODUCTION_VERIFY_URL.to_string()
}

fn default_sandbox_url() -> String {
    SANDBOX_VERIFY_URL.to_string()
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_retry_delay_ms() -> u64 {
    1_000
}

const fn default_cache_ttl_ms() -> u64 {
    300_000 // 5 minutes
}

const fn default_true() -> bool {
    true
}

const fn default_exchange_rate() -> u64 {
    1
}

const fn default_expansion_cost() -> u64 {
    1
}

const fn default_free_memo_limit() -> u64 {
    20
}

fn default_currency_name() -> String {
    "compute credits".to_string()
}

impl ReceiptConfig {
    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Backoff unit between transport retries.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Lifetime of a cached verification result.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Check that deployment-provided values are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the shared secret or bundle id is empty.
    pub fn validate(&self) -> Result<()> {
        if self.shared_secret.trim().is_empty() {
            return Err(Error::Config(
                "receipt.shared_secret must be set".to_string(),
            ));
        }
        if self.bundle_id.trim().is_empty() {
            return Err(Error::Config("receipt.bundle_id must be set".to_string()));
        }
        Ok(())
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Platform-specific default location of `config.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("com", "mjapp", "mjapp")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".mjapp/config.toml"))
}
