//! mjapp-verify CLI entry point.

mod cli;

use chrono::Utc;
use clap::Parser;
use cli::Cli;
use mjapp_client::receipt::{
    find_transaction, format_verification_error, is_valid_receipt_data, Environment, ReceiptVerifier,
    DEFAULT_MAX_TRANSACTION_AGE,
};
use serde_json::json;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(
            cli.json_logs
                .then(|| fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with((!cli.json_logs).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(filter)
        .init();

    info!("mjapp-verify v{}", env!("CARGO_PKG_VERSION"));

    let receipt = cli.receipt()?;
    if !is_valid_receipt_data(&receipt.as_text()) {
        warn!("Receipt is not canonical base64, Apple will likely reject it");
    }

    let verifier = ReceiptVerifier::new(config.receipt)?;
    let environment = if cli.sandbox {
        Environment::Sandbox
    } else {
        Environment::Production
    };
    let verified = verifier.verify_in(&receipt, environment).await;

    let output = match (&cli.transaction_id, &cli.product_id) {
        (Some(transaction_id), Some(product_id)) => verified
            .and_then(|r| {
                find_transaction(
                    r,
                    transaction_id,
                    product_id,
                    Utc::now(),
                    DEFAULT_MAX_TRANSACTION_AGE,
                )
            })
            .map(|m| json!({ "transaction": m.transaction, "environment": m.receipt.environment })),
        _ => verified.map(|r| json!(r)),
    };

    let (body, code) = match output {
        Ok(data) => (json!({ "success": true, "data": data }), ExitCode::SUCCESS),
        Err(failure) => {
            let mut body = json!(failure);
            body["success"] = json!(false);
            body["message"] = json!(format_verification_error(&failure));
            (body, ExitCode::FAILURE)
        }
    };
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(code)
}
