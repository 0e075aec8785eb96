//! Error types for the wallet classifier

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// In-band message for a malformed wallet address
pub const INVALID_ADDRESS_MESSAGE: &str = "Invalid wallet address";

/// In-band message when no provider reason is available
pub const GENERIC_FAILURE_MESSAGE: &str = "Token classification error";

/// Main error type for the classifier
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Input validation
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    // Provider errors
    #[error("Provider error: {detail}")]
    Provider {
        /// Reason reported by the provider itself, if it gave one
        reason: Option<String>,
        detail: String,
    },

    #[error("Provider timeout after {0}ms")]
    ProviderTimeout(u64),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Provider error without a provider-supplied reason
    pub fn provider(detail: impl Into<String>) -> Self {
        Error::Provider {
            reason: None,
            detail: detail.into(),
        }
    }

    /// Provider error carrying the provider's own reason string
    pub fn provider_with_reason(reason: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Provider {
            reason: Some(reason.into()),
            detail: detail.into(),
        }
    }

    /// Check if this error came from the balance provider
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Error::Provider { .. } | Error::ProviderTimeout(_) | Error::Serialization(_)
        )
    }

    /// Message reported to API callers in the `{"error": ...}` body
    pub fn response_reason(&self) -> String {
        match self {
            Error::InvalidAddress(_) => INVALID_ADDRESS_MESSAGE.to_string(),
            Error::Provider {
                reason: Some(reason),
                ..
            } if !reason.is_empty() => reason.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::provider(format!("request timed out: {}", e))
        } else {
            Error::provider(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_reason() {
        let err = Error::InvalidAddress("not-an-address".to_string());
        assert_eq!(err.response_reason(), "Invalid wallet address");
        assert!(!err.is_provider_failure());
    }

    #[test]
    fn test_provider_reason_passthrough() {
        let err = Error::provider_with_reason("rate limited", "HTTP 429");
        assert_eq!(err.response_reason(), "rate limited");
        assert!(err.is_provider_failure());
    }

    #[test]
    fn test_generic_reason_fallback() {
        assert_eq!(
            Error::provider("HTTP 500").response_reason(),
            "Token classification error"
        );
        assert_eq!(
            Error::provider_with_reason("", "empty").response_reason(),
            "Token classification error"
        );
        assert_eq!(
            Error::ProviderTimeout(30_000).response_reason(),
            "Token classification error"
        );
        assert_eq!(
            Error::Io("tokens.csv not found".to_string()).response_reason(),
            "Token classification error"
        );
    }
}
