//! Tests for pagination module

use super::*;
use crate::error::{Error, ErrorKind, Result};
use crate::fetch::{cancel_pair, FetchOptions, Page, PageFetcher, PageRequest, PageSource};
use crate::store::MemoryStore;
use crate::types::{doc, Document, Key};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use test_case::test_case;

// ============================================================================
// Fixtures
// ============================================================================

fn store_with(count: i64) -> Arc<MemoryStore> {
    let documents = (1..=count)
        .map(|i| doc! { "_id": i, "n": i * 10 })
        .collect::<Vec<Document>>();
    Arc::new(MemoryStore::with_documents("test.items", documents))
}

fn page_keys(page: &Page) -> Vec<i64> {
    page.iter().map(|d| d.get_i64("_id").unwrap()).collect()
}

/// Wraps a fetcher and fails the nth call (0-based) with a timeout
struct FailingOnCall {
    inner: PageFetcher,
    fail_at: usize,
    calls: AtomicUsize,
}

impl FailingOnCall {
    fn new(inner: PageFetcher, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl PageSource for FailingOnCall {
    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> Result<Page> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_at {
            return Err(Error::Timeout { timeout_ms: 5 });
        }
        self.inner.fetch_page(request, options).await
    }
}

// ============================================================================
// PaginationState Tests
// ============================================================================

#[test]
fn test_pagination_state_default() {
    let state = PaginationState::new();
    assert!(state.cursor.is_none());
    assert_eq!(state.pages, 0);
    assert_eq!(state.documents, 0);
    assert!(!state.done);
    assert!(!state.is_exhausted());
}

#[test]
fn test_pagination_state_record() {
    let documents = vec![doc! { "_id": 4 }, doc! { "_id": 9 }];
    let page = Page::new(documents, &PageRequest::first(5), "_id").unwrap();

    let mut state = PaginationState::starting_after(Key::Int(1));
    state.record(&page);
    assert_eq!(state.cursor, Some(Key::Int(9)));
    assert_eq!(state.pages, 1);
    assert_eq!(state.documents, 2);

    state.mark_failed();
    assert!(state.done);
    assert!(!state.is_exhausted());
}

#[test]
fn test_pagination_state_serde() {
    let state = PaginationState {
        cursor: Some(Key::String("m".to_string())),
        pages: 3,
        documents: 30,
        done: true,
        failed: false,
    };
    let json = serde_json::to_string(&state).unwrap();
    let parsed: PaginationState = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, state);
}

// ============================================================================
// Driver Tests
// ============================================================================

#[tokio::test]
async fn test_driver_twenty_five_documents() {
    let store = store_with(25);
    let mut driver = PaginationDriver::new(PageFetcher::new(store.clone()), 10);

    let first = driver.next_page().await.unwrap().unwrap();
    assert_eq!(page_keys(&first), (1..=10).collect::<Vec<_>>());
    assert_eq!(driver.cursor(), Some(&Key::Int(10)));

    let second = driver.next_page().await.unwrap().unwrap();
    assert_eq!(page_keys(&second), (11..=20).collect::<Vec<_>>());

    let third = driver.next_page().await.unwrap().unwrap();
    assert_eq!(page_keys(&third), (21..=25).collect::<Vec<_>>());
    assert!(third.is_short());
    assert!(!driver.is_done());

    assert!(driver.next_page().await.unwrap().is_none());
    assert!(driver.is_done());
    assert!(driver.state().is_exhausted());
    assert_eq!(driver.state().pages, 3);
    assert_eq!(driver.state().documents, 25);
    assert_eq!(store.query_count(), 4);

    // Finished drivers stay finished without touching the store
    assert!(driver.next_page().await.unwrap().is_none());
    assert_eq!(store.query_count(), 4);
}

#[test_case(1 ; "single document pages")]
#[test_case(3 ; "uneven pages")]
#[test_case(5 ; "exact division")]
#[test_case(17 ; "larger than half")]
#[test_case(25 ; "whole collection")]
#[test_case(100 ; "limit beyond collection")]
#[tokio::test]
async fn test_driver_full_walk_yields_every_document_once(limit: u32) {
    let mut driver = PaginationDriver::new(PageFetcher::new(store_with(25)), limit);

    let pages = driver.collect_all().await.unwrap();
    let keys: Vec<i64> = pages.iter().flat_map(page_keys).collect();
    assert_eq!(keys, (1..=25).collect::<Vec<_>>());
    assert!(pages.iter().all(|p| p.len() <= limit as usize));
    assert_eq!(pages.len(), 25_usize.div_ceil(limit as usize));
}

#[tokio::test]
async fn test_driver_every_limit_concatenates_to_collection() {
    for limit in 1..=12 {
        let mut driver = PaginationDriver::new(PageFetcher::new(store_with(11)), limit);
        let pages = driver.collect_all().await.unwrap();
        let keys: Vec<i64> = pages.iter().flat_map(page_keys).collect();
        assert_eq!(keys, (1..=11).collect::<Vec<_>>(), "limit {limit}");
    }
}

#[tokio::test]
async fn test_driver_empty_collection() {
    let mut driver = PaginationDriver::new(PageFetcher::new(store_with(0)), 10);
    assert!(driver.next_page().await.unwrap().is_none());
    assert!(driver.is_done());
    assert_eq!(driver.state().pages, 0);
}

#[tokio::test]
async fn test_driver_starting_after() {
    let fetcher = PageFetcher::new(store_with(25));
    let mut driver = PaginationDriver::new(fetcher, 10).starting_after(Key::Int(18));

    let pages = driver.collect_all().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(page_keys(&pages[0]), (19..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_driver_restart_from_observed_cursor() {
    let store = store_with(25);

    let mut first = PaginationDriver::new(PageFetcher::new(store.clone()), 4);
    first.next_page().await.unwrap();
    first.next_page().await.unwrap();
    let saved = first.state().clone();
    assert_eq!(saved.cursor, Some(Key::Int(8)));

    let mut resumed = PaginationDriver::new(PageFetcher::new(store), 4).resume(saved);
    let rest = resumed.collect_all().await.unwrap();
    let keys: Vec<i64> = rest.iter().flat_map(page_keys).collect();
    assert_eq!(keys, (9..=25).collect::<Vec<_>>());
    assert_eq!(resumed.state().documents, 25);
}

#[tokio::test]
async fn test_driver_resume_reopens_finished_walk() {
    let store = store_with(5);
    let mut driver = PaginationDriver::new(PageFetcher::new(store.clone()), 10);
    driver.collect_all().await.unwrap();
    let finished = driver.state().clone();
    assert!(finished.done);

    store.insert(doc! { "_id": 6_i64 }).await;
    let mut resumed = PaginationDriver::new(PageFetcher::new(store), 10).resume(finished);
    let pages = resumed.collect_all().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(page_keys(&pages[0]), vec![6]);
}

#[tokio::test]
async fn test_driver_halts_after_error() {
    let store = store_with(25);
    let source = Arc::new(FailingOnCall::new(PageFetcher::new(store.clone()), 1));
    let mut driver = PaginationDriver::new(source.clone(), 10);

    assert!(driver.next_page().await.unwrap().is_some());

    let err = driver.next_page().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(driver.is_done());
    assert!(driver.state().failed);
    assert_eq!(driver.cursor(), Some(&Key::Int(10)));

    assert!(driver.next_page().await.unwrap().is_none());
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.query_count(), 1);
}

#[tokio::test]
async fn test_driver_zero_limit_fails_first_fetch() {
    let mut driver = PaginationDriver::new(PageFetcher::new(store_with(3)), 0);
    let err = driver.next_page().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
    assert!(driver.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_driver_with_cancelled_options() {
    let (handle, signal) = cancel_pair();
    handle.cancel();
    let mut driver = PaginationDriver::new(PageFetcher::new(store_with(3)), 2)
        .with_options(FetchOptions::new().cancel_on(signal));

    let err = driver.next_page().await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(driver.cursor().is_none());
}

#[tokio::test]
async fn test_driver_tolerates_inserts_ahead_of_cursor() {
    let store = store_with(4);
    let mut driver = PaginationDriver::new(PageFetcher::new(store.clone()), 2);

    driver.next_page().await.unwrap();
    store.insert(doc! { "_id": 5_i64 }).await;
    store.insert(doc! { "_id": 0_i64 }).await;

    let rest = driver.collect_all().await.unwrap();
    let keys: Vec<i64> = rest.iter().flat_map(page_keys).collect();
    // The key inserted behind the cursor is never seen
    assert_eq!(keys, vec![3, 4, 5]);
}

#[tokio::test]
async fn test_driver_walk_stays_in_first_key_type() {
    let store = store_with(3);
    store.insert(doc! { "_id": "a" }).await;
    store.insert(doc! { "_id": "b" }).await;
    let mut driver = PaginationDriver::new(PageFetcher::new(store), 2);

    let pages = driver.collect_all().await.unwrap();
    let keys: Vec<i64> = pages.iter().flat_map(page_keys).collect();
    // $gt on a number never reaches the string keys
    assert_eq!(keys, vec![1, 2, 3]);
    assert_eq!(driver.cursor(), Some(&Key::Int(3)));
    assert!(driver.state().is_exhausted());
}

#[tokio::test]
async fn test_driver_ignores_deletions_behind_cursor() {
    let store = store_with(6);
    let mut driver = PaginationDriver::new(PageFetcher::new(store.clone()), 2);

    let first = driver.next_page().await.unwrap().unwrap();
    assert_eq!(page_keys(&first), vec![1, 2]);

    assert_eq!(store.remove("_id", &Key::Int(2)).await, 1);
    assert_eq!(store.remove("_id", &Key::Int(1)).await, 1);

    let rest = driver.collect_all().await.unwrap();
    let keys: Vec<i64> = rest.iter().flat_map(page_keys).collect();
    assert_eq!(keys, vec![3, 4, 5, 6]);
    assert_eq!(driver.state().documents, 6);
}

// ============================================================================
// Stream Tests
// ============================================================================

#[tokio::test]
async fn test_driver_stream() {
    let driver = PaginationDriver::new(PageFetcher::new(store_with(25)), 10);
    let pages: Vec<Result<Page>> = driver.into_stream().collect().await;

    assert_eq!(pages.len(), 3);
    let sizes: Vec<usize> = pages.iter().map(|p| p.as_ref().unwrap().len()).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
}

#[tokio::test]
async fn test_driver_stream_take() {
    let store = store_with(25);
    let driver = PaginationDriver::new(PageFetcher::new(store.clone()), 5);
    let pages: Vec<Result<Page>> = driver.into_stream().take(2).collect().await;

    assert_eq!(pages.len(), 2);
    assert_eq!(store.query_count(), 2);
}

#[tokio::test]
async fn test_driver_stream_ends_after_error() {
    let source = FailingOnCall::new(PageFetcher::new(store_with(25)), 2);
    let driver = PaginationDriver::new(source, 10);
    let results: Vec<Result<Page>> = driver.into_stream().collect().await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_err());
}

#[tokio::test]
async fn test_driver_over_shared_source() {
    let fetcher = Arc::new(PageFetcher::new(store_with(6)));
    let mut a = PaginationDriver::new(fetcher.clone(), 4);
    let mut b = PaginationDriver::new(fetcher, 3);

    let (pa, pb) = tokio::join!(a.collect_all(), b.collect_all());
    assert_eq!(pa.unwrap().len(), 2);
    assert_eq!(pb.unwrap().len(), 2);
}
