//! Pagination driver
//!
//! Repeatedly fetches the page after the last seen key until a fetch comes
//! back empty. A short page is still yielded; exhaustion is only confirmed by
//! the empty fetch that follows it.

use super::types::PaginationState;
use crate::error::Result;
use crate::fetch::{FetchOptions, Page, PageRequest, PageSource};
use crate::types::Key;
use futures::Stream;
use tracing::debug;

/// Lazy, finite sequence of pages over a collection
#[derive(Debug)]
pub struct PaginationDriver<S> {
    /// Where pages come from
    source: S,
    /// Page size
    limit: u32,
    /// Options passed to every fetch
    options: FetchOptions,
    /// Walk progress
    state: PaginationState,
}

impl<S: PageSource> PaginationDriver<S> {
    /// Create a driver that starts at the beginning of the collection
    pub fn new(source: S, limit: u32) -> Self {
        Self {
            source,
            limit,
            options: FetchOptions::default(),
            state: PaginationState::new(),
        }
    }

    /// Start after a previously observed key
    #[must_use]
    pub fn starting_after(mut self, cursor: Key) -> Self {
        self.state.cursor = Some(cursor);
        self
    }

    /// Resume from saved progress
    ///
    /// Counters carry over; a finished state is reopened so the walk picks
    /// up anything inserted after its cursor.
    #[must_use]
    pub fn resume(mut self, state: PaginationState) -> Self {
        self.state = PaginationState {
            done: false,
            failed: false,
            ..state
        };
        self
    }

    /// Set the options used for every fetch
    #[must_use]
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Cursor the next fetch will use
    pub fn cursor(&self) -> Option<&Key> {
        self.state.cursor.as_ref()
    }

    /// Whether the walk has ended, by exhaustion or error
    pub fn is_done(&self) -> bool {
        self.state.done
    }

    /// Walk progress
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Page size
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Fetch the next page
    ///
    /// Returns `Ok(None)` once the collection is exhausted. An error is
    /// returned once and ends the walk; later calls return `Ok(None)` and
    /// the cursor stays at the last page successfully yielded.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.state.done {
            return Ok(None);
        }

        let request = PageRequest {
            cursor: self.state.cursor.clone(),
            limit: self.limit,
        };

        let page = match self.source.fetch_page(&request, &self.options).await {
            Ok(page) => page,
            Err(e) => {
                debug!(
                    "Pagination halted after {} pages at {:?}: {}",
                    self.state.pages, self.state.cursor, e
                );
                self.state.mark_failed();
                return Err(e);
            }
        };

        if page.is_empty() {
            debug!(
                "Pagination exhausted after {} pages, {} documents",
                self.state.pages, self.state.documents
            );
            self.state.mark_done();
            return Ok(None);
        }

        self.state.record(&page);
        Ok(Some(page))
    }

    /// Consume the driver into a stream of pages
    ///
    /// The stream ends after exhaustion or after yielding the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> {
        futures::stream::try_unfold(self, |mut driver| async move {
            let next = driver.next_page().await?;
            Ok(next.map(|page| (page, driver)))
        })
    }

    /// Fetch every remaining page into memory
    pub async fn collect_all(&mut self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await? {
            pages.push(page);
        }
        Ok(pages)
    }
}
