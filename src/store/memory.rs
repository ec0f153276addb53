//! In-process document store
//!
//! Applies MongoDB's filter, sort and limit semantics over a vector of
//! documents: keys sort number < string < ObjectId, and a `$gt` bound only
//! matches keys of its own type. Used by tests and for dry runs without a
//! database.

use super::types::{DocumentStore, FindQuery};
use crate::error::Result;
use crate::types::{Document, Key};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Document store backed by memory
#[derive(Debug)]
pub struct MemoryStore {
    /// Reported namespace
    namespace: String,
    /// Stored documents, in insertion order
    documents: RwLock<Vec<Document>>,
    /// Artificial delay before each query answers
    latency: Option<Duration>,
    /// Number of queries served
    queries: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            documents: RwLock::new(Vec::new()),
            latency: None,
            queries: AtomicUsize::new(0),
        }
    }

    /// Create a store holding `documents`
    pub fn with_documents(namespace: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
            ..Self::new(namespace)
        }
    }

    /// Delay every query by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add a document
    pub async fn insert(&self, document: Document) {
        self.documents.write().await.push(document);
    }

    /// Remove every document whose `field` equals `key`, returning how many went
    pub async fn remove(&self, field: &str, key: &Key) -> usize {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|d| Key::from_document(d, field).ok().as_ref() != Some(key));
        before - documents.len()
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Number of queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.queries.fetch_add(1, Ordering::SeqCst);

        let documents = self.documents.read().await;
        let mut matched: Vec<(Option<Key>, &Document)> = documents
            .iter()
            .filter(|d| query.filter.matches(d))
            .map(|d| (Key::from_document(d, &query.sort.field).ok(), d))
            .collect();

        // Missing keys sort first, as null does in the store
        matched.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(matched
            .into_iter()
            .take(query.limit as usize)
            .map(|(_, d)| d.clone())
            .collect())
    }

    fn namespace(&self) -> String {
        self.namespace.clone()
    }
}
