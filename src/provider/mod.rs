//! Wallet token balance providers
//!
//! The classifier only sees the [`TokenBalanceProvider`] capability: one
//! page of owned tokens per call, with an opaque page key when more remain.

pub mod alchemy;
#[cfg(test)]
pub(crate) mod stub;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use alchemy::AlchemyProvider;

/// One page of tokens owned by a wallet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPage {
    #[serde(default)]
    pub tokens: Vec<OwnedTokenBalance>,
    /// Continuation key, present when more pages exist
    #[serde(default)]
    pub page_key: Option<String>,
}

impl TokenPage {
    /// Continuation key if another page should be requested
    pub fn next_page_key(&self) -> Option<&str> {
        self.page_key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Token balance as reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedTokenBalance {
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    /// Decimal-adjusted balance, left unparsed until classification
    #[serde(default)]
    pub balance: Option<RawBalance>,
}

impl OwnedTokenBalance {
    pub fn new(symbol: impl Into<String>, balance: impl Into<RawBalance>) -> Self {
        Self {
            contract_address: None,
            symbol: Some(symbol.into()),
            balance: Some(balance.into()),
        }
    }
}

/// Balance value in whatever shape the provider sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBalance {
    Number(f64),
    Text(String),
}

impl RawBalance {
    /// Numeric value, `None` when the text is not a finite number
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            RawBalance::Number(n) => *n,
            RawBalance::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<&str> for RawBalance {
    fn from(s: &str) -> Self {
        RawBalance::Text(s.to_string())
    }
}

impl From<String> for RawBalance {
    fn from(s: String) -> Self {
        RawBalance::Text(s)
    }
}

impl From<f64> for RawBalance {
    fn from(n: f64) -> Self {
        RawBalance::Number(n)
    }
}

/// Capability for querying the tokens a wallet owns
#[async_trait]
pub trait TokenBalanceProvider: Send + Sync {
    /// Fetch one page of owned tokens, starting after `page_key` if given
    async fn get_tokens_for_owner(&self, owner: &str, page_key: Option<&str>) -> Result<TokenPage>;
}

/// Networks served by the balance provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Network {
    #[default]
    #[serde(rename = "eth-mainnet")]
    EthMainnet,
    #[serde(rename = "eth-sepolia")]
    EthSepolia,
    #[serde(rename = "polygon-mainnet")]
    PolygonMainnet,
    #[serde(rename = "arb-mainnet")]
    ArbitrumMainnet,
    #[serde(rename = "opt-mainnet")]
    OptimismMainnet,
    #[serde(rename = "base-mainnet")]
    BaseMainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::EthMainnet => "eth-mainnet",
            Network::EthSepolia => "eth-sepolia",
            Network::PolygonMainnet => "polygon-mainnet",
            Network::ArbitrumMainnet => "arb-mainnet",
            Network::OptimismMainnet => "opt-mainnet",
            Network::BaseMainnet => "base-mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eth-mainnet" => Ok(Network::EthMainnet),
            "eth-sepolia" => Ok(Network::EthSepolia),
            "polygon-mainnet" => Ok(Network::PolygonMainnet),
            "arb-mainnet" => Ok(Network::ArbitrumMainnet),
            "opt-mainnet" => Ok(Network::OptimismMainnet),
            "base-mainnet" => Ok(Network::BaseMainnet),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_balance_parsing() {
        assert_eq!(RawBalance::from("75").to_f64(), Some(75.0));
        assert_eq!(RawBalance::from(" 0.125 ").to_f64(), Some(0.125));
        assert_eq!(RawBalance::from(12.5).to_f64(), Some(12.5));
        assert_eq!(RawBalance::from("").to_f64(), None);
        assert_eq!(RawBalance::from("n/a").to_f64(), None);
        assert_eq!(RawBalance::from(f64::NAN).to_f64(), None);
    }

    #[test]
    fn test_token_page_deserialize() {
        let json = r#"{
            "tokens": [
                {"contractAddress": "0xa0b8", "symbol": "USDC", "balance": "12.5", "decimals": 6},
                {"contractAddress": "0xdead", "symbol": null, "error": "metadata unavailable"},
                {"symbol": "WEIRD", "balance": 3}
            ],
            "pageKey": "abc"
        }"#;
        let page: TokenPage = serde_json::from_str(json).unwrap();

        assert_eq!(page.tokens.len(), 3);
        assert_eq!(page.tokens[0].symbol.as_deref(), Some("USDC"));
        assert_eq!(page.tokens[0].balance, Some(RawBalance::Text("12.5".to_string())));
        assert_eq!(page.tokens[1].symbol, None);
        assert_eq!(page.tokens[1].balance, None);
        assert_eq!(page.tokens[2].balance, Some(RawBalance::Number(3.0)));
        assert_eq!(page.next_page_key(), Some("abc"));
    }

    #[test]
    fn test_empty_page_key_ends_pagination() {
        let page: TokenPage = serde_json::from_str(r#"{"tokens": [], "pageKey": ""}"#).unwrap();
        assert_eq!(page.next_page_key(), None);

        let page: TokenPage = serde_json::from_str(r#"{"tokens": []}"#).unwrap();
        assert_eq!(page.next_page_key(), None);
    }

    #[test]
    fn test_network_parse() {
        assert_eq!("eth-mainnet".parse::<Network>(), Ok(Network::EthMainnet));
        assert_eq!("BASE-MAINNET".parse::<Network>(), Ok(Network::BaseMainnet));
        assert!("solana".parse::<Network>().is_err());
        assert_eq!(Network::default().to_string(), "eth-mainnet");
    }
}
