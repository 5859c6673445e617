//! Command-line interface definition.

use clap::{ArgGroup, Parser};
use color_eyre::eyre::WrapErr;
use mjapp_client::config::{default_config_path, ClientConfig};
use mjapp_client::receipt::ReceiptData;
use std::path::PathBuf;

/// Verify an App Store receipt against Apple's verifyReceipt endpoints.
#[derive(Parser, Debug)]
#[command(name = "mjapp-verify")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["receipt_file", "receipt"])))]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short, env = "MJAPP_CONFIG")]
    pub config: Option<PathBuf>,

    /// App Store shared secret.
    #[arg(long, env = "MJAPP_SHARED_SECRET", hide_env_values = true)]
    pub shared_secret: Option<String>,

    /// Expected bundle identifier.
    #[arg(long, env = "MJAPP_BUNDLE_ID")]
    pub bundle_id: Option<String>,

    /// File holding the base64 receipt.
    #[arg(long, short = 'f')]
    pub receipt_file: Option<PathBuf>,

    /// Base64 receipt given inline.
    #[arg(long, short)]
    pub receipt: Option<String>,

    /// Transaction to look up in the verified receipt.
    #[arg(long, requires = "product_id")]
    pub transaction_id: Option<String>,

    /// Product the transaction must be for.
    #[arg(long, requires = "transaction_id")]
    pub product_id: Option<String>,

    /// Start in the sandbox environment.
    #[arg(long)]
    pub sandbox: bool,

    /// Log level.
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl Cli {
    /// Load the config file and apply CLI overrides.
    ///
    /// Without `--config`, the default path is used when it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be loaded.
    pub fn load_config(&self) -> color_eyre::Result<ClientConfig> {
        let path = self.config.clone().or_else(|| {
            let default = default_config_path();
            default.exists().then_some(default)
        });

        let mut config = if let Some(ref path) = path {
            ClientConfig::from_file(path)
                .wrap_err_with(|| format!("loading {}", path.display()))?
        } else {
            ClientConfig::default()
        };

        if let Some(ref secret) = self.shared_secret {
            config.receipt.shared_secret.clone_from(secret);
        }
        if let Some(ref bundle_id) = self.bundle_id {
            config.receipt.bundle_id.clone_from(bundle_id);
        }
        if let Some(ref level) = self.log_level {
            config.log_level.clone_from(level);
        }

        Ok(config)
    }

    /// Read the receipt from `--receipt` or `--receipt-file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt file cannot be read.
    pub fn receipt(&self) -> color_eyre::Result<ReceiptData> {
        if let Some(ref inline) = self.receipt {
            return Ok(ReceiptData::from(inline.trim()));
        }
        let path = self
            .receipt_file
            .as_ref()
            .ok_or_else(|| color_eyre::eyre::eyre!("no receipt given"))?;
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        Ok(ReceiptData::from(text.trim()))
    }
}
