//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::provider::alchemy::DEMO_API_KEY;
use crate::provider::Network;
use crate::registry::{ReloadPolicy, DEFAULT_MAX_RANDOM_THRESHOLD};

/// Environment variable holding the provider API key
pub const PROVIDER_KEY_ENV: &str = "PROVIDER_KEY";

/// Environment variable holding the fallback threshold ceiling
pub const MAX_RANDOM_THRESHOLD_ENV: &str = "MAX_RANDOM_THRESHOLD_USED";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Balance provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// API key; the public demo key is used when unset
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub network: Network,
    /// Full JSON-RPC URL, overrides `network` and `api_key`
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Budget for fetching all pages of one wallet, 0 disables
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl ProviderConfig {
    /// Configured key, or the demo key for local development
    pub fn effective_api_key(&self) -> &str {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(DEMO_API_KEY)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            network: Network::default(),
            endpoint: None,
            request_timeout_ms: default_request_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// Token list settings
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_tokens_path")]
    pub tokens_path: PathBuf,
    /// Exclusive upper bound for fallback thresholds
    #[serde(default = "default_max_random_threshold")]
    pub max_random_threshold: f64,
    #[serde(default)]
    pub reload: ReloadPolicy,
    /// Seed for fallback thresholds; unseeded draws differ per load
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tokens_path: default_tokens_path(),
            max_random_threshold: default_max_random_threshold(),
            reload: ReloadPolicy::default(),
            seed: None,
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_tokens_path() -> PathBuf {
    PathBuf::from("tokens.csv")
}

fn default_max_random_threshold() -> f64 {
    DEFAULT_MAX_RANDOM_THRESHOLD
}

/// Non-empty value of an environment variable
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Threshold ceiling from its raw env value
///
/// Non-numeric, zero and negative values are ignored so the default applies.
fn parse_max_threshold(raw: Option<&str>) -> Option<f64> {
    raw?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let max_threshold = parse_max_threshold(env_value(MAX_RANDOM_THRESHOLD_ENV).as_deref());

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("server.bind_addr", default_bind_addr())?
            .set_default("provider.request_timeout_ms", default_request_timeout_ms() as i64)?
            .set_default("provider.fetch_timeout_ms", default_fetch_timeout_ms() as i64)?
            .set_default("registry.tokens_path", "tokens.csv")?
            .set_default("registry.max_random_threshold", default_max_random_threshold())?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix GODMODE_)
            .add_source(
                config::Environment::with_prefix("GODMODE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Plain variable names used by existing deployments
            .set_override_option("provider.api_key", env_value(PROVIDER_KEY_ENV))?
            .set_override_option("registry.max_random_threshold", max_threshold)?
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid server.bind_addr: {}", self.server.bind_addr))?;

        if self.provider.request_timeout_ms == 0 {
            anyhow::bail!("provider.request_timeout_ms must be positive");
        }

        if let Some(endpoint) = &self.provider.endpoint {
            url::Url::parse(endpoint)
                .with_context(|| format!("Invalid provider.endpoint: {}", mask_url(endpoint)))?;
        }

        if self.registry.tokens_path.as_os_str().is_empty() {
            anyhow::bail!("registry.tokens_path must not be empty");
        }

        let max = self.registry.max_random_threshold;
        if !max.is_finite() || max < 0.0 {
            anyhow::bail!(
                "registry.max_random_threshold must be a non-negative number, got {}",
                max
            );
        }

        if self.provider.effective_api_key() == DEMO_API_KEY && self.provider.endpoint.is_none() {
            tracing::warn!(
                "No provider API key set, using the public '{}' key (development only)",
                DEMO_API_KEY
            );
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Server:
    bind_addr: {}
  Provider:
    network: {}
    endpoint: {}
    api_key: {}
    request_timeout: {}ms
    fetch_timeout: {}
  Registry:
    tokens_path: {}
    max_random_threshold: {}
    reload: {:?}
    seed: {}
"#,
            self.server.bind_addr,
            self.provider.network,
            self.provider
                .endpoint
                .as_deref()
                .map(mask_url)
                .unwrap_or_else(|| "(hosted)".to_string()),
            mask_api_key(self.provider.effective_api_key()),
            self.provider.request_timeout_ms,
            if self.provider.fetch_timeout_ms == 0 {
                "disabled".to_string()
            } else {
                format!("{}ms", self.provider.fetch_timeout_ms)
            },
            self.registry.tokens_path.display(),
            self.registry.max_random_threshold,
            self.registry.reload,
            self.registry
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(entropy)".to_string()),
        )
    }
}

/// Mask URL for display (hide API keys in path and query params)
fn mask_url(url: &str) -> String {
    let base = match url.find('?') {
        Some(idx) => format!("{}?***", &url[..idx]),
        None => url.to_string(),
    };
    match base.find("/v2/") {
        Some(idx) => format!("{}/v2/***", &base[..idx]),
        None => base,
    }
}

fn mask_api_key(key: &str) -> String {
    if key == DEMO_API_KEY {
        format!("{} (public sandbox key)", DEMO_API_KEY)
    } else {
        "***".to_string()
    }
}
