//! CLI command implementations

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::provider::AlchemyProvider;
use crate::registry::RegistryLoader;
use crate::server;
use crate::wallet::{BalanceFetcher, WalletClassifier};

/// Wire the classifier from configuration
pub fn build_classifier(config: &Config) -> Result<WalletClassifier> {
    let provider = AlchemyProvider::from_config(&config.provider)
        .map_err(|e| anyhow::anyhow!("Failed to create balance provider: {}", e))?;
    let registry = RegistryLoader::from_config(&config.registry);
    let fetcher = BalanceFetcher::from_timeout_ms(config.provider.fetch_timeout_ms);

    info!(
        "Classifier ready: provider={}, tokens={}, reload={:?}",
        provider.label(),
        config.registry.tokens_path.display(),
        config.registry.reload
    );

    Ok(WalletClassifier::new(
        Arc::new(registry),
        Arc::new(provider),
        fetcher,
    ))
}

/// Start the HTTP API
pub async fn serve(config: &Config, bind_override: Option<String>) -> Result<()> {
    let bind = bind_override.unwrap_or_else(|| config.server.bind_addr.clone());
    let bind_addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;

    let classifier = Arc::new(build_classifier(config)?);
    server::serve(bind_addr, classifier)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))
}

/// Classify one wallet and print the JSON result
pub async fn classify(config: &Config, address: &str) -> Result<()> {
    let classifier = build_classifier(config)?;
    let result = classifier.classify(address).await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Load the token list and print the effective thresholds
pub async fn tokens(config: &Config) -> Result<()> {
    let loader = RegistryLoader::from_config(&config.registry);
    let registry = loader
        .registry()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load token list: {}", e))?;

    println!("\n=== TRACKED TOKENS ({}) ===\n", registry.len());
    println!(
        "{:<10} {:<16} {:>14} {:<8} {}",
        "SYMBOL", "NETWORK", "THRESHOLD", "ABI", "ADDRESS"
    );
    println!("{}", "-".repeat(96));

    for (symbol, token) in registry.all() {
        println!(
            "{:<10} {:<16} {:>14} {:<8} {}",
            symbol, token.network, token.threshold, token.abi_kind, token.address
        );
    }

    println!();
    Ok(())
}
