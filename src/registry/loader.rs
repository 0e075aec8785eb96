//! Token list loading with a one-time initialization guard

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use crate::config::RegistryConfig;
use crate::error::{Error, Result};

use super::fallback::{RandomThreshold, ThresholdFallback, DEFAULT_MAX_RANDOM_THRESHOLD};
use super::ThresholdRegistry;

/// When the token list is read
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Read on first use and keep for the process lifetime
    #[default]
    Once,
    /// Read again for every classification (fallback thresholds change per request)
    PerRequest,
}

/// Provides the registry to classifiers, loading it on demand
pub struct RegistryLoader {
    tokens_path: PathBuf,
    policy: ReloadPolicy,
    fallback: Mutex<Box<dyn ThresholdFallback>>,
    cached: OnceCell<Arc<ThresholdRegistry>>,
}

impl RegistryLoader {
    pub fn new(
        tokens_path: impl Into<PathBuf>,
        policy: ReloadPolicy,
        fallback: Box<dyn ThresholdFallback>,
    ) -> Self {
        Self {
            tokens_path: tokens_path.into(),
            policy,
            fallback: Mutex::new(fallback),
            cached: OnceCell::new(),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(
            &config.tokens_path,
            config.reload,
            Box::new(RandomThreshold::new(config.max_random_threshold, config.seed)),
        )
    }

    /// Loader that always serves an already-built registry
    pub fn preloaded(registry: ThresholdRegistry) -> Self {
        let fallback: Box<dyn ThresholdFallback> =
            Box::new(RandomThreshold::from_entropy(DEFAULT_MAX_RANDOM_THRESHOLD));
        Self {
            tokens_path: PathBuf::new(),
            policy: ReloadPolicy::Once,
            fallback: Mutex::new(fallback),
            cached: OnceCell::new_with(Some(Arc::new(registry))),
        }
    }

    pub fn tokens_path(&self) -> &Path {
        &self.tokens_path
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    /// Current registry, loading it if the policy requires
    ///
    /// With [`ReloadPolicy::Once`] concurrent first callers wait on a single
    /// load; a failed load is not cached and will be retried by the next caller.
    pub async fn registry(&self) -> Result<Arc<ThresholdRegistry>> {
        match self.policy {
            ReloadPolicy::Once => self
                .cached
                .get_or_try_init(|| self.load_from_disk())
                .await
                .map(Arc::clone),
            ReloadPolicy::PerRequest => self.load_from_disk().await,
        }
    }

    async fn load_from_disk(&self) -> Result<Arc<ThresholdRegistry>> {
        let content = tokio::fs::read_to_string(&self.tokens_path)
            .await
            .map_err(|e| {
                Error::Io(format!(
                    "Failed to read token list {}: {}",
                    self.tokens_path.display(),
                    e
                ))
            })?;

        let mut registry = ThresholdRegistry::new();
        let report = {
            let mut fallback = self.fallback.lock().await;
            registry.load(&content, &mut **fallback)
        };

        info!(
            "Loaded {} tokens from {} ({} skipped, {} fallback thresholds)",
            registry.len(),
            self.tokens_path.display(),
            report.skipped,
            report.fallbacks
        );

        Ok(Arc::new(registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FixedThreshold;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_once_policy_caches_first_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.csv");
        std::fs::write(&path, "0x1,FOO,Foo,,eth-mainnet\n").unwrap();

        let loader = RegistryLoader::new(
            &path,
            ReloadPolicy::Once,
            Box::new(RandomThreshold::new(1_000_000.0, None)),
        );
        let first = loader.registry().await.unwrap();

        // Changes on disk are not picked up once loaded
        std::fs::write(&path, "0x1,FOO,Foo,1,eth-mainnet\n0x2,BAR,Bar,2,eth-mainnet\n").unwrap();
        let second = loader.registry().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_per_request_policy_rereads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.csv");
        std::fs::write(&path, "0x1,FOO,Foo,10,eth-mainnet\n").unwrap();

        let loader =
            RegistryLoader::new(&path, ReloadPolicy::PerRequest, Box::new(FixedThreshold(0.0)));
        assert_eq!(loader.registry().await.unwrap().len(), 1);

        std::fs::write(&path, "0x1,FOO,Foo,10,eth-mainnet\n0x2,BAR,Bar,,eth-mainnet\n").unwrap();
        let registry = loader.registry().await.unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("BAR").unwrap().threshold, 0.0);
    }

    #[tokio::test]
    async fn test_concurrent_first_loads_share_result() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.csv");
        std::fs::write(&path, "0x1,FOO,Foo,,eth-mainnet\n").unwrap();

        let loader = Arc::new(RegistryLoader::new(
            &path,
            ReloadPolicy::Once,
            Box::new(RandomThreshold::from_entropy(1_000_000.0)),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                tokio::spawn(async move { loader.registry().await.unwrap() })
            })
            .collect();

        let mut thresholds = Vec::new();
        for handle in handles {
            thresholds.push(handle.await.unwrap().get("FOO").unwrap().threshold);
        }
        assert!(thresholds.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let loader = RegistryLoader::new(
            dir.path().join("missing.csv"),
            ReloadPolicy::Once,
            Box::new(FixedThreshold(0.0)),
        );

        let err = loader.registry().await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_preloaded() {
        let mut registry = ThresholdRegistry::new();
        registry.load("0x1,FOO,Foo,50,eth-mainnet\n", &mut FixedThreshold(0.0));

        let loader = RegistryLoader::preloaded(registry);
        assert_eq!(loader.registry().await.unwrap().get("FOO").unwrap().threshold, 50.0);
    }
}
