//! Retry policy
//!
//! Re-issues fetches that failed with a retryable error. The page request
//! is unchanged between attempts, so a retried fetch is the same query.

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::fetch::{FetchOptions, Page, PageRequest, PageSource};
use crate::types::BackoffType;
use std::time::Duration;
use tracing::warn;

/// Page source that retries retryable failures with backoff
#[derive(Debug)]
pub struct Retrying<S> {
    inner: S,
    /// Retries after the first attempt
    max_retries: u32,
    backoff_type: BackoffType,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl<S: PageSource> Retrying<S> {
    /// Wrap a source with retry settings from config
    pub fn new(inner: S, config: &RetryConfig) -> Self {
        Self {
            inner,
            max_retries: config.max_retries,
            backoff_type: config.backoff.backoff_type,
            initial_backoff: Duration::from_millis(config.backoff.initial_ms),
            max_backoff: Duration::from_millis(config.backoff.max_ms),
        }
    }

    /// Set the maximum number of retries
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// The wrapped source
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Backoff delay before retry number `attempt` (0-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }
}

#[async_trait::async_trait]
impl<S: PageSource> PageSource for Retrying<S> {
    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> Result<Page> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch_page(request, options).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.calculate_backoff(attempt);
                    warn!(
                        "Fetch after {:?} failed: {}, attempt {}/{}, retrying in {:?}",
                        request.cursor,
                        e,
                        attempt + 1,
                        self.max_retries,
                        delay
                    );

                    match &options.cancel {
                        Some(cancel) => tokio::select! {
                            biased;
                            () = cancel.cancelled() => return Err(Error::Cancelled),
                            () = tokio::time::sleep(delay) => {}
                        },
                        None => tokio::time::sleep(delay).await,
                    }
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
