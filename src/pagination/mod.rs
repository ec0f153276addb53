//! Pagination module
//!
//! Walks a collection page by page, feeding each page's last key back in as
//! the cursor for the next fetch.
//!
//! # Overview
//!
//! `PaginationDriver` wraps any `PageSource` (a `PageFetcher` or one of the
//! policy wrappers around it) and yields pages lazily, either through
//! `next_page` or as a `futures` stream. The walk ends on the first empty
//! page or the first error; it can be restarted from any observed cursor.

mod driver;
mod types;

pub use driver::PaginationDriver;
pub use types::PaginationState;

#[cfg(test)]
mod tests;
