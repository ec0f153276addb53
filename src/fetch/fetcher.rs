//! Page fetcher implementation
//!
//! Turns a cursor and a limit into one bounded, ascending query, runs it
//! against the store and validates the answer. Every call is reported to
//! the observer as a start event followed by exactly one success or
//! failure event.

use super::types::{FetchOptions, Page, PageRequest, PageSource};
use crate::config::PaginationSettings;
use crate::error::{Error, Result};
use crate::observe::{Observer, QueryEvent};
use crate::store::{DocumentStore, Filter, FindQuery, SortSpec};
use crate::types::{document_to_json, JsonValue, Key, DEFAULT_ID_FIELD};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Operation name reported for page queries
pub const FIND_OPERATION: &str = "find";

/// Default deadline for a single fetch
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches single pages from a document store
pub struct PageFetcher {
    /// Store to query
    store: Arc<dyn DocumentStore>,
    /// Receives query events
    observer: Observer,
    /// Identifying key field
    id_field: String,
    /// Deadline when the caller gives none
    timeout: Duration,
}

impl PageFetcher {
    /// Create a fetcher with default settings and no hooks
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            observer: Observer::new(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a fetcher from pagination settings
    pub fn from_settings(
        store: Arc<dyn DocumentStore>,
        settings: &PaginationSettings,
        observer: Observer,
    ) -> Self {
        Self {
            store,
            observer,
            id_field: settings.id_field.clone(),
            timeout: settings.timeout(),
        }
    }

    /// Set the observer
    #[must_use]
    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    /// Set the identifying key field
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Set the default deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Identifying key field
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Namespace of the underlying store
    pub fn namespace(&self) -> String {
        self.store.namespace()
    }

    /// Fetch the page after `cursor` with default options
    pub async fn fetch(&self, cursor: Option<&Key>, limit: u32) -> Result<Page> {
        let request = PageRequest {
            cursor: cursor.cloned(),
            limit,
        };
        self.fetch_with(&request, &FetchOptions::default()).await
    }

    /// Fetch one page
    pub async fn fetch_with(&self, request: &PageRequest, options: &FetchOptions) -> Result<Page> {
        let namespace = self.store.namespace();
        let query = self.build_query(request);

        let event = QueryEvent::started(
            self.observer.next_request_id(),
            FIND_OPERATION,
            namespace.as_str(),
            query.to_command(collection_name(&namespace)),
        );
        self.observer.query_started(&event);

        let started = Instant::now();
        let result = self.execute(request, &query, options).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(page) => {
                debug!(
                    "Fetched {} documents from {} after {:?}",
                    page.len(),
                    namespace,
                    request.cursor
                );
                self.observer
                    .query_succeeded(&event.succeeded(reply_json(page, &namespace), elapsed));
            }
            Err(e) => {
                debug!("Fetch from {} failed: {}", namespace, e);
                self.observer.query_failed(&event.failed(e, elapsed));
            }
        }

        result
    }

    /// Build the bounded, ascending query for a request
    pub fn build_query(&self, request: &PageRequest) -> FindQuery {
        let filter = match &request.cursor {
            Some(cursor) => Filter::after(&self.id_field, cursor.clone()),
            None => Filter::All,
        };
        FindQuery::new(filter, SortSpec::ascending(&self.id_field), request.limit)
    }

    async fn execute(
        &self,
        request: &PageRequest,
        query: &FindQuery,
        options: &FetchOptions,
    ) -> Result<Page> {
        request.validate()?;

        let timeout = options.timeout.unwrap_or(self.timeout);
        let find = tokio::time::timeout(timeout, self.store.find(query));

        let outcome = match &options.cancel {
            Some(cancel) => tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = find => outcome,
            },
            None => find.await,
        };

        let documents = outcome.map_err(|_| Error::timeout(timeout))??;
        Page::new(documents, request, &self.id_field)
    }
}

#[async_trait::async_trait]
impl PageSource for PageFetcher {
    async fn fetch_page(&self, request: &PageRequest, options: &FetchOptions) -> Result<Page> {
        self.fetch_with(request, options).await
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("namespace", &self.store.namespace())
            .field("id_field", &self.id_field)
            .field("timeout", &self.timeout)
            .field("observer", &self.observer)
            .finish()
    }
}

fn collection_name(namespace: &str) -> &str {
    namespace
        .split_once('.')
        .map_or(namespace, |(_, collection)| collection)
}

/// Reply in the shape the store reports for a single-batch `find`
fn reply_json(page: &Page, namespace: &str) -> JsonValue {
    let batch: Vec<JsonValue> = page.iter().map(document_to_json).collect();
    json!({
        "cursor": {
            "firstBatch": batch,
            "id": 0,
            "ns": namespace,
        },
        "ok": 1,
    })
}
