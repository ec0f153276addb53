//! Checkpoint types
//!
//! Serialized to JSON and persisted between walks.

use crate::pagination::PaginationState;
use crate::types::Key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every saved walk, keyed by namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoints {
    /// Per-namespace progress
    #[serde(default)]
    pub walks: HashMap<String, Checkpoint>,
}

impl Checkpoints {
    /// Create an empty checkpoint set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the checkpoint for a namespace
    pub fn get(&self, namespace: &str) -> Option<&Checkpoint> {
        self.walks.get(namespace)
    }

    /// Get the cursor for a namespace
    pub fn get_cursor(&self, namespace: &str) -> Option<&Key> {
        self.walks.get(namespace)?.cursor.as_ref()
    }

    /// Replace the checkpoint for a namespace
    pub fn record(&mut self, namespace: &str, state: &PaginationState) {
        self.walks
            .insert(namespace.to_string(), Checkpoint::from_state(state));
    }
}

/// Progress of one walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Key of the last document delivered
    #[serde(default)]
    pub cursor: Option<Key>,
    /// Pages delivered
    #[serde(default)]
    pub pages: u64,
    /// Documents delivered
    #[serde(default)]
    pub documents: u64,
    /// Whether the walk reached the end of the collection
    #[serde(default)]
    pub exhausted: bool,
    /// When the checkpoint was written
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot a driver's progress
    pub fn from_state(state: &PaginationState) -> Self {
        Self {
            cursor: state.cursor.clone(),
            pages: state.pages,
            documents: state.documents,
            exhausted: state.is_exhausted(),
            updated_at: Utc::now(),
        }
    }

    /// Progress to resume a driver from
    pub fn to_state(&self) -> PaginationState {
        PaginationState {
            cursor: self.cursor.clone(),
            pages: self.pages,
            documents: self.documents,
            ..PaginationState::default()
        }
    }
}
