//! Scripted provider for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::{OwnedTokenBalance, TokenBalanceProvider, TokenPage};

/// What the stub does on a given call
pub(crate) enum StubStep {
    Page(TokenPage),
    Fail(Error),
}

/// Serves scripted steps in order and records the page keys it was asked for
pub(crate) struct StubProvider {
    steps: Mutex<Vec<StubStep>>,
    calls: AtomicUsize,
    seen_keys: Mutex<Vec<Option<String>>>,
}

impl StubProvider {
    pub(crate) fn new(steps: Vec<StubStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().rev().collect()),
            calls: AtomicUsize::new(0),
            seen_keys: Mutex::new(Vec::new()),
        }
    }

    /// Single page holding `balances`
    pub(crate) fn with_balances(balances: Vec<OwnedTokenBalance>) -> Self {
        Self::new(vec![StubStep::Page(TokenPage {
            tokens: balances,
            page_key: None,
        })])
    }

    /// Pages of the given sizes, each linked to the next by a page key
    pub(crate) fn paged(sizes: &[usize]) -> Self {
        let steps = sizes
            .iter()
            .enumerate()
            .map(|(page, &size)| {
                let tokens = (0..size)
                    .map(|i| OwnedTokenBalance::new(format!("TOK{}_{}", page, i), "1"))
                    .collect();
                let page_key = (page + 1 < sizes.len()).then(|| format!("key-{}", page + 1));
                StubStep::Page(TokenPage { tokens, page_key })
            })
            .collect();
        Self::new(steps)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_keys(&self) -> Vec<Option<String>> {
        self.seen_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenBalanceProvider for StubProvider {
    async fn get_tokens_for_owner(
        &self,
        _owner: &str,
        page_key: Option<&str>,
    ) -> Result<TokenPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_keys
            .lock()
            .unwrap()
            .push(page_key.map(str::to_string));

        match self.steps.lock().unwrap().pop() {
            Some(StubStep::Page(page)) => Ok(page),
            Some(StubStep::Fail(err)) => Err(err),
            None => Err(Error::Internal("stub provider exhausted".to_string())),
        }
    }
}
