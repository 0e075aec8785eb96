//! GodMode Wallet Classifier Library
//!
//! Classifies an Ethereum wallet per tracked token by comparing its balances
//! against configured thresholds.

pub mod cli;
pub mod config;
pub mod error;
pub mod provider;
pub mod registry;
pub mod server;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use provider::{AlchemyProvider, TokenBalanceProvider};
pub use registry::{RegistryLoader, ThresholdRegistry, TokenConfig};
pub use wallet::{Classification, ClassificationRecord, ClassificationResult, WalletClassifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
