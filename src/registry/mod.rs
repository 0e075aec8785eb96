//! Token threshold registry
//!
//! Holds the per-token GodMode thresholds read from the token list.
//! The list has no header and one record per line:
//!
//! ```text
//! address,symbol,<unused>,threshold,network
//! ```
//!
//! Thresholds that are missing or unparseable are replaced by a
//! [`ThresholdFallback`] draw, so a registry entry always carries a finite
//! non-negative threshold.

pub mod fallback;
pub mod loader;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub use fallback::{
    FixedThreshold, RandomThreshold, ThresholdFallback, DEFAULT_MAX_RANDOM_THRESHOLD,
};
pub use loader::{RegistryLoader, ReloadPolicy};

/// ABI tag assigned to every loaded token
pub const ERC20_ABI_KIND: &str = "ERC-20";

const FIELDS_PER_RECORD: usize = 5;

/// Configuration for a single tracked token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenConfig {
    /// Upper-cased symbol, the registry key
    pub symbol: String,
    /// Token contract address (not validated beyond presence)
    pub address: String,
    pub network: String,
    pub threshold: f64,
    pub abi_kind: String,
}

/// Why a token list line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 5 comma-separated fields, got {0}")]
    FieldCount(usize),

    #[error("missing {0}")]
    MissingField(&'static str),
}

/// Raw fields of one token list line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TokenRecord<'a> {
    address: &'a str,
    symbol: &'a str,
    threshold_text: &'a str,
    network: &'a str,
}

fn parse_record(line: &str) -> Result<TokenRecord<'_>, RecordError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != FIELDS_PER_RECORD {
        return Err(RecordError::FieldCount(fields.len()));
    }

    // Third column is carried by the list format but not used
    let record = TokenRecord {
        address: fields[0],
        symbol: fields[1],
        threshold_text: fields[3],
        network: fields[4],
    };

    if record.address.is_empty() {
        return Err(RecordError::MissingField("address"));
    }
    if record.symbol.is_empty() {
        return Err(RecordError::MissingField("symbol"));
    }

    Ok(record)
}

/// Parse a threshold column, `None` when it must fall back
///
/// Reads the leading integer the way `parseInt` does: surrounding whitespace,
/// an optional sign and a `0x` prefix are accepted, and anything after the
/// digits is dropped (`"250.5"` is 250, `"10abc"` is 10). Negative values
/// fall back.
pub fn parse_threshold(text: &str) -> Option<f64> {
    let text = text.trim();
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, body) = match unsigned.get(..2) {
        Some("0x") | Some("0X") => (16, &unsigned[2..]),
        _ => (10, unsigned),
    };

    let digits: Vec<u32> = body.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return None;
    }

    let value = digits
        .iter()
        .fold(0.0_f64, |acc, &d| acc * f64::from(radix) + f64::from(d));
    if negative && value > 0.0 {
        return None;
    }

    Some(value).filter(|v| v.is_finite())
}

/// Outcome of a single [`ThresholdRegistry::load`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Records stored (including overwrites)
    pub loaded: usize,
    /// Malformed records skipped
    pub skipped: usize,
    /// Records whose threshold came from the fallback
    pub fallbacks: usize,
}

/// Mapping of token symbol to its configuration
#[derive(Debug, Default, Clone)]
pub struct ThresholdRegistry {
    tokens: BTreeMap<String, TokenConfig>,
}

impl ThresholdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load token list content into the registry
    ///
    /// Later records (and later loads) replace earlier entries with the same
    /// symbol. Malformed lines are logged and skipped; blank lines are ignored.
    pub fn load(&mut self, source: &str, fallback: &mut dyn ThresholdFallback) -> LoadReport {
        let mut report = LoadReport::default();

        for (idx, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record = match parse_record(line) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping token list line {}: {}", idx + 1, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let threshold = match parse_threshold(record.threshold_text) {
                Some(t) => t,
                None => {
                    let t = fallback.fallback_threshold();
                    debug!(
                        "No usable threshold for {} ({:?}), using fallback {}",
                        record.symbol, record.threshold_text, t
                    );
                    report.fallbacks += 1;
                    t
                }
            };

            self.insert(TokenConfig {
                symbol: record.symbol.to_string(),
                address: record.address.to_string(),
                network: record.network.to_string(),
                threshold,
                abi_kind: ERC20_ABI_KIND.to_string(),
            });
            report.loaded += 1;
        }

        report
    }

    /// Insert or replace a token, normalizing its symbol
    pub fn insert(&mut self, mut token: TokenConfig) {
        token.symbol = token.symbol.to_uppercase();
        self.tokens.insert(token.symbol.clone(), token);
    }

    /// Look up a token by symbol (case-insensitive)
    pub fn get(&self, symbol: &str) -> Option<&TokenConfig> {
        self.tokens.get(&symbol.to_uppercase())
    }

    /// All registered tokens, ordered by symbol
    pub fn all(&self) -> impl Iterator<Item = (&str, &TokenConfig)> {
        self.tokens.iter().map(|(symbol, token)| (symbol.as_str(), token))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
