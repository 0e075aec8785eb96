//! Paginated balance retrieval
//!
//! Pages are requested strictly one after another since each page key comes
//! from the previous response. All pages are collected before returning, so
//! callers always see the complete token list or an error.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::provider::{OwnedTokenBalance, TokenBalanceProvider};

/// Follows provider pagination until no page key is returned
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceFetcher {
    /// Budget for the whole pagination run, `None` waits indefinitely
    timeout: Option<Duration>,
}

impl BalanceFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// From a millisecond budget where `0` disables the limit
    pub fn from_timeout_ms(timeout_ms: u64) -> Self {
        if timeout_ms == 0 {
            Self::new()
        } else {
            Self::with_timeout(Duration::from_millis(timeout_ms))
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Fetch every token owned by `address` across all pages
    pub async fn fetch_all(
        &self,
        address: &str,
        provider: &dyn TokenBalanceProvider,
    ) -> Result<Vec<OwnedTokenBalance>> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fetch_pages(address, provider))
                .await
                .map_err(|_| Error::ProviderTimeout(limit.as_millis() as u64))?,
            None => fetch_pages(address, provider).await,
        }
    }
}

async fn fetch_pages(
    address: &str,
    provider: &dyn TokenBalanceProvider,
) -> Result<Vec<OwnedTokenBalance>> {
    let mut page = provider.get_tokens_for_owner(address, None).await?;
    let mut pages = 1;
    debug!("Page {} for {}: {} tokens", pages, address, page.tokens.len());
    let mut balances = std::mem::take(&mut page.tokens);

    while let Some(key) = page.next_page_key().map(str::to_string) {
        page = provider.get_tokens_for_owner(address, Some(&key)).await?;
        pages += 1;
        debug!("Page {} for {}: {} tokens", pages, address, page.tokens.len());
        balances.append(&mut page.tokens);
    }

    info!(
        "Fetched {} token balances for {} in {} page(s)",
        balances.len(),
        address,
        pages
    );
    Ok(balances)
}
