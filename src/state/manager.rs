//! Checkpoint manager implementation
//!
//! File-based checkpoint persistence with atomic writes.

use super::types::{Checkpoint, Checkpoints};
use crate::error::{Error, Result};
use crate::pagination::PaginationState;
use crate::types::Key;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Loads and saves walk checkpoints
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    /// Path to the checkpoint file, empty in memory mode
    path: PathBuf,
    /// Current checkpoints (cached)
    checkpoints: Arc<RwLock<Checkpoints>>,
    /// Whether to save on every update
    auto_save: bool,
}

impl CheckpointManager {
    /// Create a manager writing to `path`, starting empty
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            checkpoints: Arc::new(RwLock::new(Checkpoints::new())),
            auto_save: true,
        }
    }

    /// Create a manager with no file behind it
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            checkpoints: Arc::new(RwLock::new(Checkpoints::new())),
            auto_save: false,
        }
    }

    /// Create a manager from a file, loading existing checkpoints if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let checkpoints = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::state(format!("Failed to read checkpoint file: {e}")))?;
            parse(&contents)?
        } else {
            Checkpoints::new()
        };

        Ok(Self {
            path,
            checkpoints: Arc::new(RwLock::new(checkpoints)),
            auto_save: true,
        })
    }

    /// Disable saving on every update
    #[must_use]
    pub fn without_auto_save(mut self) -> Self {
        self.auto_save = false;
        self
    }

    /// Reload checkpoints from the file
    pub async fn load(&self) -> Result<()> {
        if self.is_in_memory() || !self.path.exists() {
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to read checkpoint file: {e}")))?;
        let loaded = parse(&contents)?;

        *self.checkpoints.write().await = loaded;
        Ok(())
    }

    /// Write checkpoints to the file
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let contents = self.to_json_pretty().await?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write checkpoint file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename checkpoint file: {e}")))?;

        debug!("Saved checkpoints to {}", self.path.display());
        Ok(())
    }

    /// Checkpoint for a namespace
    pub async fn get(&self, namespace: &str) -> Option<Checkpoint> {
        self.checkpoints.read().await.get(namespace).cloned()
    }

    /// Cursor for a namespace
    pub async fn get_cursor(&self, namespace: &str) -> Option<Key> {
        self.checkpoints.read().await.get_cursor(namespace).cloned()
    }

    /// Progress to resume a namespace's walk from
    pub async fn resume_state(&self, namespace: &str) -> Option<PaginationState> {
        self.get(namespace).await.map(|c| c.to_state())
    }

    /// Record a driver's progress
    pub async fn record(&self, namespace: &str, state: &PaginationState) -> Result<()> {
        self.checkpoints.write().await.record(namespace, state);

        if self.auto_save {
            self.save().await?;
        }
        Ok(())
    }

    /// Forget a namespace's progress
    pub async fn clear(&self, namespace: &str) -> Result<()> {
        self.checkpoints.write().await.walks.remove(namespace);

        if self.auto_save {
            self.save().await?;
        }
        Ok(())
    }

    /// Export checkpoints as pretty-printed JSON
    pub async fn to_json_pretty(&self) -> Result<String> {
        let checkpoints = self.checkpoints.read().await;
        serde_json::to_string_pretty(&*checkpoints)
            .map_err(|e| Error::state(format!("Failed to serialize checkpoints: {e}")))
    }

    /// Checkpoint file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there is no file behind this manager
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

fn parse(contents: &str) -> Result<Checkpoints> {
    serde_json::from_str(contents)
        .map_err(|e| Error::state(format!("Failed to parse checkpoint file: {e}")))
}
