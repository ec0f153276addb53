//! Rate limiting
//!
//! Token bucket pacing of page fetches, built on the governor crate.

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};
use crate::fetch::{FetchOptions, Page, PageRequest, PageSource};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a rate limiter from config
    ///
    /// Zero values are raised to one.
    pub fn new(config: &RateLimitConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rate).allow_burst(burst);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a fetch may proceed
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to take a permit without waiting
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait with a timeout, returning whether a permit was taken
    pub async fn wait_with_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.limiter.until_ready())
            .await
            .is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

/// Page source that waits for a rate limit permit before every fetch
#[derive(Debug)]
pub struct RateLimited<S> {
    inner: S,
    limiter: RateLimiter,
}

impl<S: PageSource> RateLimited<S> {
    /// Wrap a source with a fresh limiter
    pub fn new(inner: S, config: &RateLimitConfig) -> Self {
        Self::with_limiter(inner, RateLimiter::new(config))
    }

    /// Wrap a source with a shared limiter
    pub fn with_limiter(inner: S, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }

    /// The wrapped source
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<S: PageSource> PageSource for RateLimited<S> {
    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> Result<Page> {
        match &options.cancel {
            Some(cancel) => tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = self.limiter.wait() => {}
            },
            None => self.limiter.wait().await,
        }
        self.inner.fetch_page(request, options).await
    }
}
