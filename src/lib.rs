//! # Solidafy Pager
//!
//! Cursor-based pagination over a document store.
//!
//! Each page is one bounded query, sorted ascending by a unique key and
//! filtered to keys strictly greater than the last key already seen. No
//! server-side cursor stays open between pages, so a walk can stop at any
//! page and resume later from the last key it observed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_pager::{MongoStore, PageFetcher, PaginationDriver, PagerConfig, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PagerConfig::from_env()?;
//!     let store = Arc::new(MongoStore::connect(&config.store).await?);
//!
//!     let mut driver = PaginationDriver::new(PageFetcher::new(store), 10);
//!     while let Some(page) = driver.next_page().await? {
//!         for document in page {
//!             println!("{document}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                 PaginationDriver (pagination)               │
//! │   next_page() / into_stream()      cursor = page.last_key   │
//! └─────────────────────────────┬──────────────────────────────┘
//!                               │ PageSource
//! ┌───────────────┬─────────────┴───────────┬──────────────────┐
//! │    policy     │      PageFetcher        │     observe      │
//! ├───────────────┼─────────────────────────┼──────────────────┤
//! │ Retrying      │ filter  key > cursor    │ QueryHook        │
//! │ RateLimited   │ sort    key ascending   │ Observer         │
//! │               │ limit   page size       │ TracingHook      │
//! └───────────────┴─────────────┬───────────┴──────────────────┘
//!                               │ DocumentStore
//!                 ┌─────────────┴─────────────┐
//!                 │ MongoStore │ MemoryStore  │
//!                 └───────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::unused_async)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types: keys, documents, backoff
pub mod types;

/// Configuration file and environment loading
pub mod config;

/// Document store abstraction and implementations
pub mod store;

/// Single page fetches
pub mod fetch;

/// Page-by-page walks
pub mod pagination;

/// Query event hooks
pub mod observe;

/// Retry and rate limit wrappers
pub mod policy;

/// Walk checkpoints
pub mod state;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::PagerConfig;
pub use error::{Error, ErrorKind, Result};
pub use fetch::{cancel_pair, FetchOptions, Page, PageFetcher, PageRequest, PageSource};
pub use observe::{Observer, QueryEvent, QueryHook, TracingHook};
pub use pagination::PaginationDriver;
pub use store::{DocumentStore, MemoryStore, MongoStore};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
