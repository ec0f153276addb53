//! Pagination types
//!
//! Progress bookkeeping for a walk over a collection.

use crate::fetch::Page;
use crate::types::Key;
use serde::{Deserialize, Serialize};

/// Progress of a pagination walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Key of the last document yielded, the cursor for the next fetch
    pub cursor: Option<Key>,
    /// Pages yielded so far
    pub pages: u64,
    /// Documents yielded so far
    pub documents: u64,
    /// No further pages will be fetched
    pub done: bool,
    /// The walk stopped on an error rather than exhaustion
    pub failed: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state that resumes after a cursor
    pub fn starting_after(cursor: Key) -> Self {
        Self {
            cursor: Some(cursor),
            ..Default::default()
        }
    }

    /// Record a yielded page and advance the cursor
    pub fn record(&mut self, page: &Page) {
        self.pages += 1;
        self.documents += page.len() as u64;
        if let Some(key) = page.last_key() {
            self.cursor = Some(key.clone());
        }
    }

    /// Mark the walk as exhausted
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Mark the walk as halted by an error
    pub fn mark_failed(&mut self) {
        self.done = true;
        self.failed = true;
    }

    /// Whether the walk ran to exhaustion
    pub fn is_exhausted(&self) -> bool {
        self.done && !self.failed
    }
}
