//! GodMode classification of a wallet
//!
//! Joins a wallet's balance snapshot against every registered token. A
//! token counts as GodMode only when an observed balance is strictly above
//! its threshold; a missing or unparseable balance never qualifies.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::provider::TokenBalanceProvider;
use crate::registry::{RegistryLoader, ThresholdRegistry};

use super::address::validate_address;
use super::fetcher::BalanceFetcher;
use super::snapshot::BalanceSnapshot;

/// Per-token verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "GodMode")]
    GodMode,
    #[serde(rename = "Not GodMode")]
    NotGodMode,
}

impl Classification {
    /// Strictly-greater comparison; no balance never beats a threshold
    pub fn decide(balance: Option<f64>, threshold: f64) -> Self {
        match balance {
            Some(b) if b > threshold => Classification::GodMode,
            _ => Classification::NotGodMode,
        }
    }

    pub fn is_god_mode(&self) -> bool {
        matches!(self, Classification::GodMode)
    }
}

/// Verdict for one registered token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub classification: Classification,
    pub threshold: f64,
    /// Observed balance, `null` when the wallet reported none
    pub balance: Option<f64>,
}

/// Response for one classification request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationResult {
    Failed { error: String },
    Classified(BTreeMap<String, ClassificationRecord>),
}

impl ClassificationResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ClassificationResult::Failed { .. })
    }

    pub fn records(&self) -> Option<&BTreeMap<String, ClassificationRecord>> {
        match self {
            ClassificationResult::Classified(records) => Some(records),
            ClassificationResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ClassificationResult::Failed { error } => Some(error),
            ClassificationResult::Classified(_) => None,
        }
    }
}

/// Classify a snapshot against every token in the registry
pub fn classify_snapshot(
    registry: &ThresholdRegistry,
    snapshot: &BalanceSnapshot,
) -> BTreeMap<String, ClassificationRecord> {
    registry
        .all()
        .map(|(symbol, token)| {
            let balance = snapshot.balance(symbol);
            let record = ClassificationRecord {
                classification: Classification::decide(balance, token.threshold),
                threshold: token.threshold,
                balance,
            };
            (symbol.to_string(), record)
        })
        .collect()
}

/// Orchestrates address validation, balance fetching and classification
pub struct WalletClassifier {
    registry: Arc<RegistryLoader>,
    provider: Arc<dyn TokenBalanceProvider>,
    fetcher: BalanceFetcher,
}

impl WalletClassifier {
    pub fn new(
        registry: Arc<RegistryLoader>,
        provider: Arc<dyn TokenBalanceProvider>,
        fetcher: BalanceFetcher,
    ) -> Self {
        Self {
            registry,
            provider,
            fetcher,
        }
    }

    pub fn registry(&self) -> &RegistryLoader {
        &self.registry
    }

    /// Classify a wallet, reporting any failure in-band
    pub async fn classify(&self, address: &str) -> ClassificationResult {
        match self.try_classify(address).await {
            Ok(records) => ClassificationResult::Classified(records),
            Err(e) => {
                warn!("Error while processing token balances for {}: {}", address, e);
                ClassificationResult::Failed {
                    error: e.response_reason(),
                }
            }
        }
    }

    /// Classify a wallet, returning the typed error on failure
    ///
    /// Invalid addresses are rejected before the registry or provider is touched.
    pub async fn try_classify(
        &self,
        address: &str,
    ) -> Result<BTreeMap<String, ClassificationRecord>> {
        let address = validate_address(address)?;
        let registry = self.registry.registry().await?;

        let balances = self.fetcher.fetch_all(address, self.provider.as_ref()).await?;
        let snapshot = BalanceSnapshot::aggregate(balances);

        let records = classify_snapshot(&registry, &snapshot);
        debug!(
            "Classified {}: {} of {} tokens in GodMode",
            address,
            records.values().filter(|r| r.classification.is_god_mode()).count(),
            records.len()
        );
        Ok(records)
    }
}
