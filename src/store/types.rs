//! Store query types
//!
//! The pager only ever needs one capability from a store: run a filtered,
//! sorted, bounded query. These types describe that query independently of
//! the backend that executes it.

use crate::error::Result;
use crate::types::{doc, document_to_json, Document, JsonValue, Key};
use std::cmp::Ordering;

/// Document filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Match every document
    All,
    /// Match documents whose `field` is strictly greater than `key`
    After {
        /// Identifying key field
        field: String,
        /// Exclusive lower bound
        key: Key,
    },
}

impl Filter {
    /// Create a strict lower bound filter
    pub fn after(field: impl Into<String>, key: Key) -> Self {
        Self::After {
            field: field.into(),
            key,
        }
    }

    /// Check a document against this filter
    ///
    /// Documents without the field, or whose field holds an unsupported key
    /// type, never match a bounded filter. Like `$gt`, the bound only matches
    /// keys of its own type.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::After { field, key } => Key::from_document(document, field)
                .map(|k| k.same_type(key) && k.cmp(key) == Ordering::Greater)
                .unwrap_or(false),
        }
    }

    /// Render as a store query document
    pub fn to_document(&self) -> Document {
        match self {
            Self::All => Document::new(),
            Self::After { field, key } => {
                let mut filter = Document::new();
                filter.insert(field.clone(), doc! { "$gt": key.to_bson() });
                filter
            }
        }
    }
}

/// Ascending sort on a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to sort by
    pub field: String,
}

impl SortSpec {
    /// Sort ascending by `field`
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Render as a store sort document
    pub fn to_document(&self) -> Document {
        let mut sort = Document::new();
        sort.insert(self.field.clone(), 1);
        sort
    }
}

/// A single bounded, sorted, filtered query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindQuery {
    /// Which documents to match
    pub filter: Filter,
    /// Result order
    pub sort: SortSpec,
    /// Maximum number of documents to return
    pub limit: u32,
}

impl FindQuery {
    /// Create a new query
    pub fn new(filter: Filter, sort: SortSpec, limit: u32) -> Self {
        Self {
            filter,
            sort,
            limit,
        }
    }

    /// Serialize in `find` command shape for observers
    pub fn to_command(&self, collection: &str) -> JsonValue {
        let command = doc! {
            "find": collection,
            "filter": self.filter.to_document(),
            "sort": self.sort.to_document(),
            "limit": i64::from(self.limit),
        };
        document_to_json(&command)
    }
}

/// Store that can run bounded queries
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run one query and return the matched documents in order
    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>>;

    /// `database.collection` the store reads from
    fn namespace(&self) -> String;

    /// Check the store is reachable
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
