//! Page fetching module
//!
//! A single stateless fetch: given an optional last-seen key and a limit,
//! run one bounded query sorted ascending by the identifying key.
//!
//! # Overview
//!
//! - `PageFetcher` - issues the query and validates the response
//! - `PageSource` - trait shared by the fetcher and the policy wrappers
//! - `Page` / `PageRequest` - immutable result and request types
//! - `FetchOptions` / `CancelSignal` - per-call deadline and cancellation

mod fetcher;
mod types;

pub use fetcher::{PageFetcher, FIND_OPERATION};
pub use types::{
    cancel_pair, CancelHandle, CancelSignal, FetchOptions, Page, PageRequest, PageSource,
};
