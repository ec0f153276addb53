//! Checkpoint module
//!
//! Persists walk progress so a walk can resume from its last cursor.
//!
//! # Overview
//!
//! - `Checkpoints` - per-namespace progress
//! - `CheckpointManager` - file-based persistence with atomic writes

mod manager;
mod types;

pub use manager::CheckpointManager;
pub use types::{Checkpoint, Checkpoints};
