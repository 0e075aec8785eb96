//! Balance aggregation

use std::collections::HashMap;

use tracing::debug;

use crate::provider::{OwnedTokenBalance, RawBalance};

/// Balances of one wallet keyed by token symbol
///
/// Values are kept as the provider sent them; they are only parsed when a
/// token is classified.
#[derive(Debug, Clone, Default)]
pub struct BalanceSnapshot {
    balances: HashMap<String, Option<RawBalance>>,
}

impl BalanceSnapshot {
    /// Fold provider balances in order; a repeated symbol overwrites the earlier value
    pub fn aggregate(balances: impl IntoIterator<Item = OwnedTokenBalance>) -> Self {
        let mut snapshot = Self::default();
        for entry in balances {
            match entry.symbol {
                Some(symbol) => {
                    snapshot.balances.insert(symbol, entry.balance);
                }
                None => debug!(
                    "Ignoring balance without symbol (contract {:?})",
                    entry.contract_address
                ),
            }
        }
        snapshot
    }

    /// Raw value stored for `symbol`
    pub fn raw(&self, symbol: &str) -> Option<&RawBalance> {
        self.balances.get(symbol).and_then(Option::as_ref)
    }

    /// Numeric balance, `None` when absent or not a number
    pub fn balance(&self, symbol: &str) -> Option<f64> {
        self.raw(symbol).and_then(RawBalance::to_f64)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.balances.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_duplicate_wins() {
        let snapshot = BalanceSnapshot::aggregate(vec![
            OwnedTokenBalance::new("FOO", "1"),
            OwnedTokenBalance::new("BAR", "2"),
            OwnedTokenBalance::new("FOO", "3"),
        ]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.balance("FOO"), Some(3.0));
        assert_eq!(snapshot.balance("BAR"), Some(2.0));
    }

    #[test]
    fn test_raw_values_untouched() {
        let snapshot = BalanceSnapshot::aggregate(vec![
            OwnedTokenBalance::new("FOO", "0.000001"),
            OwnedTokenBalance::new("BAD", "n/a"),
        ]);

        assert_eq!(snapshot.raw("FOO"), Some(&RawBalance::Text("0.000001".to_string())));
        assert_eq!(snapshot.raw("BAD"), Some(&RawBalance::Text("n/a".to_string())));
        assert_eq!(snapshot.balance("BAD"), None);
    }

    #[test]
    fn test_missing_symbol_and_balance() {
        let snapshot = BalanceSnapshot::aggregate(vec![
            OwnedTokenBalance {
                contract_address: Some("0xdead".to_string()),
                symbol: None,
                balance: Some(RawBalance::from("5")),
            },
            OwnedTokenBalance {
                contract_address: None,
                symbol: Some("NOBAL".to_string()),
                balance: None,
            },
        ]);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains("NOBAL"));
        assert_eq!(snapshot.balance("NOBAL"), None);
        assert_eq!(snapshot.balance("MISSING"), None);
    }

    #[test]
    fn test_symbols_are_case_sensitive() {
        let snapshot = BalanceSnapshot::aggregate(vec![OwnedTokenBalance::new("foo", "9")]);
        assert_eq!(snapshot.balance("FOO"), None);
        assert_eq!(snapshot.balance("foo"), Some(9.0));
    }
}
