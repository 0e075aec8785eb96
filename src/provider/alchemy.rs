//! Alchemy API client for wallet token balances
//!
//! A page of owned tokens is assembled from two JSON-RPC methods:
//! `alchemy_getTokenBalances` lists up to 100 ERC-20 contracts with their raw
//! hex balances (plus a `pageKey` when the wallet holds more), and
//! `alchemy_getTokenMetadata` supplies each contract's symbol and decimals.
//! Metadata never changes for a contract, so it is cached per client.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{Error, Result};

use super::{Network, OwnedTokenBalance, RawBalance, TokenBalanceProvider, TokenPage};

/// Public sandbox key accepted by Alchemy for low-volume testing.
/// Only meant for local development; it is heavily rate limited.
pub const DEMO_API_KEY: &str = "demo";

const GET_TOKEN_BALANCES: &str = "alchemy_getTokenBalances";
const GET_TOKEN_METADATA: &str = "alchemy_getTokenMetadata";

/// Token set selector for `alchemy_getTokenBalances`
const ERC20_TOKEN_SPEC: &str = "erc20";

/// Alchemy JSON-RPC client
pub struct AlchemyProvider {
    /// HTTP client
    client: Client,
    /// Full JSON-RPC URL (contains the API key)
    endpoint: String,
    /// Label for logs, never contains the key
    label: String,
    /// Per-request timeout
    timeout: Duration,
    /// Metadata by lower-cased contract address
    metadata_cache: Mutex<HashMap<String, TokenMetadata>>,
}

impl AlchemyProvider {
    /// Create a client for the hosted Alchemy endpoint of `network`
    pub fn new(api_key: &str, network: Network, timeout: Duration) -> Result<Self> {
        Self::with_endpoint(endpoint_url(network, api_key), network.to_string(), timeout)
    }

    /// Create a client for an explicit JSON-RPC URL
    pub fn with_endpoint(endpoint: String, label: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            label,
            timeout,
            metadata_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Build from configuration, falling back to the demo key when none is set
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let api_key = config.effective_api_key();
        if api_key == DEMO_API_KEY {
            warn!(
                "Using the public '{}' provider key - rate limited, not for production use",
                DEMO_API_KEY
            );
        }

        match &config.endpoint {
            Some(endpoint) => {
                Self::with_endpoint(endpoint.clone(), "custom endpoint".to_string(), timeout)
            }
            None => Self::new(api_key, config.network, timeout),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn cached_metadata(&self, contract: &str) -> Option<TokenMetadata> {
        self.metadata_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(&contract.to_lowercase()).cloned())
    }

    fn cache_metadata(&self, contract: &str, metadata: &TokenMetadata) {
        if let Ok(mut cache) = self.metadata_cache.lock() {
            cache.insert(contract.to_lowercase(), metadata.clone());
        }
    }

    /// Metadata for every contract, in input order
    ///
    /// Uncached contracts are requested concurrently.
    async fn resolve_metadata(&self, contracts: &[String]) -> Result<Vec<TokenMetadata>> {
        let pending: Vec<PendingMetadata> = contracts
            .iter()
            .map(|contract| match self.cached_metadata(contract) {
                Some(metadata) => PendingMetadata::Cached(metadata),
                None => {
                    let client = self.client.clone();
                    let endpoint = self.endpoint.clone();
                    let timeout = self.timeout;
                    let body = metadata_request_body(contract);
                    PendingMetadata::Requested(tokio::spawn(async move {
                        rpc_call::<TokenMetadata>(&client, &endpoint, timeout, &body).await
                    }))
                }
            })
            .collect();

        let mut resolved = Vec::with_capacity(contracts.len());
        for (contract, pending) in contracts.iter().zip(pending) {
            let metadata = match pending {
                PendingMetadata::Cached(metadata) => metadata,
                PendingMetadata::Requested(task) => {
                    let metadata = task.await.map_err(|e| {
                        Error::Internal(format!("Metadata task for {} failed: {}", contract, e))
                    })??;
                    self.cache_metadata(contract, &metadata);
                    metadata
                }
            };
            resolved.push(metadata);
        }

        Ok(resolved)
    }
}

enum PendingMetadata {
    Cached(TokenMetadata),
    Requested(JoinHandle<Result<TokenMetadata>>),
}

/// Hosted JSON-RPC URL for a network
pub fn endpoint_url(network: Network, api_key: &str) -> String {
    format!("https://{}.g.alchemy.com/v2/{}", network.as_str(), api_key)
}

fn balances_request_body(owner: &str, page_key: Option<&str>) -> serde_json::Value {
    let params = match page_key {
        Some(key) => serde_json::json!([owner, ERC20_TOKEN_SPEC, { "pageKey": key }]),
        None => serde_json::json!([owner, ERC20_TOKEN_SPEC]),
    };

    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": GET_TOKEN_BALANCES,
        "params": params,
    })
}

fn metadata_request_body(contract: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": GET_TOKEN_METADATA,
        "params": [contract],
    })
}

async fn rpc_call<T: DeserializeOwned>(
    client: &Client,
    endpoint: &str,
    timeout: Duration,
    body: &serde_json::Value,
) -> Result<T> {
    let response = client
        .post(endpoint)
        .json(body)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        // Rate-limit and auth failures usually still carry a JSON-RPC error
        let reason = serde_json::from_str::<RpcResponse<serde_json::Value>>(&text)
            .ok()
            .and_then(|r| r.error)
            .map(|e| e.message);
        let detail = format!("Alchemy HTTP {}: {}", status, text);
        return Err(match reason {
            Some(reason) => Error::provider_with_reason(reason, detail),
            None => Error::provider(detail),
        });
    }

    parse_response(&text)
}

#[async_trait]
impl TokenBalanceProvider for AlchemyProvider {
    async fn get_tokens_for_owner(&self, owner: &str, page_key: Option<&str>) -> Result<TokenPage> {
        debug!(
            "Fetching token balances for {} from {} (page key: {:?})",
            owner, self.label, page_key
        );

        let body = balances_request_body(owner, page_key);
        let balances: TokenBalancesResult =
            rpc_call(&self.client, &self.endpoint, self.timeout, &body).await?;

        let contracts: Vec<String> = balances
            .token_balances
            .iter()
            .map(|b| b.contract_address.clone())
            .collect();
        let metadata = self.resolve_metadata(&contracts).await?;

        let tokens = balances
            .token_balances
            .into_iter()
            .zip(metadata)
            .map(|(balance, metadata)| owned_balance(balance, metadata))
            .collect();

        Ok(TokenPage {
            tokens,
            page_key: balances.page_key,
        })
    }
}

fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let rpc_response: RpcResponse<T> = serde_json::from_str(body)
        .map_err(|e| Error::Serialization(format!("Failed to parse Alchemy response: {}", e)))?;

    if let Some(error) = rpc_response.error {
        return Err(Error::provider_with_reason(
            error.message.clone(),
            format!("Alchemy RPC error {}: {}", error.code, error.message),
        ));
    }

    rpc_response
        .result
        .ok_or_else(|| Error::provider("No result in Alchemy RPC response"))
}

/// Join a contract balance with its metadata
///
/// The balance is left empty when the raw value or the decimals are unknown.
fn owned_balance(balance: ContractBalance, metadata: TokenMetadata) -> OwnedTokenBalance {
    let formatted = match (balance.token_balance.as_deref(), metadata.decimals) {
        (Some(raw), Some(decimals)) => parse_hex_balance(raw).map(|v| format_units(v, decimals)),
        _ => None,
    };
    if let Some(error) = &balance.error {
        debug!("Balance error for {}: {}", balance.contract_address, error);
    }

    OwnedTokenBalance {
        contract_address: Some(balance.contract_address),
        symbol: metadata.symbol,
        balance: formatted.map(RawBalance::Text),
    }
}

fn parse_hex_balance(raw: &str) -> Option<U256> {
    let digits = raw.trim().strip_prefix("0x")?;
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}

/// Render a base-unit amount as a decimal string with `decimals` places
pub fn format_units(value: U256, decimals: u32) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, fraction)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalancesResult {
    #[serde(default)]
    token_balances: Vec<ContractBalance>,
    #[serde(default)]
    page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractBalance {
    contract_address: String,
    /// Hex-encoded base units, `null` when the lookup failed
    #[serde(default)]
    token_balance: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TokenMetadata {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    decimals: Option<u32>,
}
