//! Wallet classification pipeline
//!
//! # Architecture
//!
//! ```text
//! address check → RegistryLoader → BalanceFetcher → BalanceSnapshot → classify_snapshot
//!                                        ↑
//!                               TokenBalanceProvider
//! ```
//!
//! Every failure is converted to an in-band `{"error": ...}` result by
//! [`WalletClassifier::classify`]; nothing propagates past it.

pub mod address;
pub mod classifier;
pub mod fetcher;
pub mod snapshot;

pub use address::{is_valid_address, validate_address};
pub use classifier::{
    classify_snapshot, Classification, ClassificationRecord, ClassificationResult, WalletClassifier,
};
pub use fetcher::BalanceFetcher;
pub use snapshot::BalanceSnapshot;
