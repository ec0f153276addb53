//! Page fetching types and traits

use crate::error::{Error, Result};
use crate::types::{Document, Key};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

// ============================================================================
// Page Request
// ============================================================================

/// Parameters of one page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Key of the last document already seen, `None` at the start
    pub cursor: Option<Key>,
    /// Maximum number of documents to return
    pub limit: u32,
}

impl PageRequest {
    /// Request the first page
    pub fn first(limit: u32) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }

    /// Request the page after `cursor`
    pub fn after(cursor: Key, limit: u32) -> Self {
        Self {
            cursor: Some(cursor),
            limit,
        }
    }

    /// Check the request can be issued
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::query("limit must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// Page
// ============================================================================

/// One bounded batch of documents in ascending key order
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Documents, strictly ascending by key
    documents: Vec<Document>,
    /// Limit the page was requested with
    limit: u32,
    /// Key of the last document
    last_key: Option<Key>,
}

impl Page {
    /// Build a page from a store response
    ///
    /// Fails with a decode error unless the response honours the request:
    /// at most `limit` documents, every key present and supported, keys
    /// strictly ascending and all after the request cursor.
    pub fn new(documents: Vec<Document>, request: &PageRequest, id_field: &str) -> Result<Self> {
        if documents.len() > request.limit as usize {
            return Err(Error::decode(format!(
                "store returned {} documents for a limit of {}",
                documents.len(),
                request.limit
            )));
        }

        let mut previous = request.cursor.clone();
        for (position, document) in documents.iter().enumerate() {
            let key = Key::from_document(document, id_field).map_err(|e| match e {
                Error::Decode { message } => {
                    Error::decode(format!("document at position {position}: {message}"))
                }
                other => other,
            })?;

            if let Some(prev) = &previous {
                if key <= *prev {
                    return Err(Error::decode(format!(
                        "key {key} at position {position} does not follow {prev}"
                    )));
                }
            }
            previous = Some(key);
        }

        let last_key = if documents.is_empty() {
            None
        } else {
            previous
        };

        Ok(Self {
            documents,
            limit: request.limit,
            last_key,
        })
    }

    /// An empty page (exhaustion)
    pub fn empty(limit: u32) -> Self {
        Self {
            documents: Vec::new(),
            limit,
            last_key: None,
        }
    }

    /// Documents in key order
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Take ownership of the documents
    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the page holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Limit the page was requested with
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether fewer documents came back than were requested
    pub fn is_short(&self) -> bool {
        self.documents.len() < self.limit as usize
    }

    /// Key of the last document, the cursor for the next page
    pub fn last_key(&self) -> Option<&Key> {
        self.last_key.as_ref()
    }

    /// Iterate the documents
    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }
}

impl IntoIterator for Page {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Triggers cancellation of in-flight fetches
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel every fetch watching the paired signal
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by fetches; cheap to clone
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested
    ///
    /// Never resolves if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let sender_alive = rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if !sender_alive {
            std::future::pending::<()>().await;
        }
    }
}

/// Create a linked cancel handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

// ============================================================================
// Fetch Options
// ============================================================================

/// Per-call fetch options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Deadline override for this call
    pub timeout: Option<Duration>,
    /// Cancellation signal
    pub cancel: Option<CancelSignal>,
}

impl FetchOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deadline for this call
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Watch a cancellation signal
    #[must_use]
    pub fn cancel_on(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }
}

// ============================================================================
// Page Source
// ============================================================================

/// Anything that can fetch a page for a request
///
/// Implemented by `PageFetcher` and by the caller-side policy layers that
/// wrap it.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page
    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> Result<Page>;
}

#[async_trait::async_trait]
impl<S: PageSource + ?Sized> PageSource for Arc<S> {
    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> Result<Page> {
        (**self).fetch_page(request, options).await
    }
}

#[async_trait::async_trait]
impl<'a, S: PageSource + ?Sized> PageSource for &'a S {
    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> Result<Page> {
        (**self).fetch_page(request, options).await
    }
}
