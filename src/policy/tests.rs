//! Tests for fetch policies

use super::*;
use crate::config::{BackoffConfig, RateLimitConfig, RetryConfig};
use crate::error::{Error, ErrorKind, Result};
use crate::fetch::{cancel_pair, FetchOptions, Page, PageFetcher, PageRequest, PageSource};
use crate::pagination::PaginationDriver;
use crate::store::MemoryStore;
use crate::types::{doc, BackoffType, Key};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

/// Fails the first `failures` calls with `error`, then serves an empty page
struct Scripted {
    failures: u32,
    error: fn() -> Error,
    calls: AtomicU32,
}

impl Scripted {
    fn new(failures: u32, error: fn() -> Error) -> Self {
        Self {
            failures,
            error,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PageSource for Scripted {
    async fn fetch_page(&self, request: &PageRequest, _options: &FetchOptions) -> Result<Page> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err((self.error)());
        }
        Ok(Page::empty(request.limit))
    }
}

fn timeout() -> Error {
    Error::Timeout { timeout_ms: 10 }
}

fn refused() -> Error {
    Error::connection("connection refused")
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        backoff: BackoffConfig {
            backoff_type: BackoffType::Constant,
            initial_ms: 1,
            max_ms: 1,
        },
    }
}

// ============================================================================
// Retry Tests
// ============================================================================

#[test_case(BackoffType::Constant, 0, 100 ; "constant first")]
#[test_case(BackoffType::Constant, 4, 100 ; "constant later")]
#[test_case(BackoffType::Linear, 0, 100 ; "linear first")]
#[test_case(BackoffType::Linear, 2, 300 ; "linear third")]
#[test_case(BackoffType::Exponential, 0, 100 ; "exponential first")]
#[test_case(BackoffType::Exponential, 3, 800 ; "exponential fourth")]
#[test_case(BackoffType::Exponential, 10, 5000 ; "exponential capped")]
fn test_calculate_backoff(backoff_type: BackoffType, attempt: u32, expected_ms: u64) {
    let retrying = Retrying::new(Scripted::new(0, timeout), &RetryConfig::default()).backoff(
        backoff_type,
        Duration::from_millis(100),
        Duration::from_millis(5000),
    );
    assert_eq!(
        retrying.calculate_backoff(attempt),
        Duration::from_millis(expected_ms)
    );
}

#[test]
fn test_backoff_saturates() {
    let retrying = Retrying::new(Scripted::new(0, timeout), &RetryConfig::default()).backoff(
        BackoffType::Exponential,
        Duration::from_secs(1),
        Duration::from_secs(60),
    );
    assert_eq!(retrying.calculate_backoff(u32::MAX), Duration::from_secs(60));
}

#[tokio::test]
async fn test_retry_recovers_from_timeouts() {
    let retrying = Retrying::new(Scripted::new(2, timeout), &fast_retry(3));
    let page = retrying
        .fetch_page(&PageRequest::first(5), &FetchOptions::default())
        .await
        .unwrap();
    assert!(page.is_empty());
    assert_eq!(retrying.inner().calls(), 3);
}

#[tokio::test]
async fn test_retry_gives_up_after_max_retries() {
    let retrying = Retrying::new(Scripted::new(10, timeout), &fast_retry(2));
    let err = retrying
        .fetch_page(&PageRequest::first(5), &FetchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(retrying.inner().calls(), 3);
}

#[tokio::test]
async fn test_retry_skips_non_retryable_errors() {
    let retrying = Retrying::new(Scripted::new(1, refused), &fast_retry(5));
    let err = retrying
        .fetch_page(&PageRequest::first(5), &FetchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(retrying.inner().calls(), 1);
}

#[tokio::test]
async fn test_retry_disabled() {
    let retrying = Retrying::new(Scripted::new(1, timeout), &fast_retry(0));
    assert!(retrying
        .fetch_page(&PageRequest::first(5), &FetchOptions::default())
        .await
        .is_err());
    assert_eq!(retrying.inner().calls(), 1);
}

#[tokio::test]
async fn test_retry_backoff_is_cancellable() {
    let retrying = Retrying::new(Scripted::new(10, timeout), &RetryConfig::default())
        .backoff(
            BackoffType::Constant,
            Duration::from_secs(30),
            Duration::from_secs(30),
        );
    let (handle, signal) = cancel_pair();
    let options = FetchOptions::new().cancel_on(signal);
    let request = PageRequest::first(5);

    let (result, ()) = tokio::join!(retrying.fetch_page(&request, &options), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(retrying.inner().calls(), 1);
}

// ============================================================================
// Rate Limit Tests
// ============================================================================

fn rate(requests_per_second: u32, burst_size: u32) -> RateLimitConfig {
    RateLimitConfig {
        requests_per_second,
        burst_size,
    }
}

#[tokio::test]
async fn test_rate_limiter_allows_burst() {
    let limiter = RateLimiter::new(&rate(1, 5));

    // Should allow burst of 5 requests immediately
    for _ in 0..5 {
        assert!(limiter.try_acquire());
    }
    assert!(!limiter.try_acquire());
}

#[tokio::test]
async fn test_rate_limiter_zero_config_is_clamped() {
    let limiter = RateLimiter::new(&rate(0, 0));
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());
}

#[tokio::test]
async fn test_rate_limiter_wait_with_timeout() {
    let limiter = RateLimiter::new(&rate(1, 1));
    assert!(limiter.wait_with_timeout(Duration::from_millis(100)).await);
    assert!(!limiter.wait_with_timeout(Duration::from_millis(20)).await);
}

#[tokio::test]
async fn test_rate_limited_source_delegates() {
    let limited = RateLimited::new(Scripted::new(0, timeout), &rate(100, 10));
    for _ in 0..3 {
        limited
            .fetch_page(&PageRequest::first(5), &FetchOptions::default())
            .await
            .unwrap();
    }
    assert_eq!(limited.inner().calls(), 3);
}

#[tokio::test]
async fn test_rate_limited_wait_is_cancellable() {
    let limiter = RateLimiter::new(&rate(1, 1));
    assert!(limiter.try_acquire());

    let limited = RateLimited::with_limiter(Scripted::new(0, timeout), limiter);
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let err = limited
        .fetch_page(
            &PageRequest::first(5),
            &FetchOptions::new().cancel_on(signal),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(limited.inner().calls(), 0);
}

// ============================================================================
// Composition
// ============================================================================

#[tokio::test]
async fn test_policies_compose_under_driver() {
    let documents = (1..=7).map(|i: i64| doc! { "_id": i }).collect();
    let store = Arc::new(MemoryStore::with_documents("db.items", documents));
    let source = Retrying::new(
        RateLimited::new(PageFetcher::new(store), &rate(1000, 10)),
        &fast_retry(2),
    );

    let mut driver = PaginationDriver::new(source, 3);
    let pages = driver.collect_all().await.unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(driver.cursor(), Some(&Key::Int(7)));
}
