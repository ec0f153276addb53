//! Caller-side fetch policies
//!
//! Wrappers that layer pacing and retries over any `PageSource`. The
//! fetcher itself never retries or throttles; compose these around it:
//!
//! ```ignore
//! let source = Retrying::new(RateLimited::new(fetcher, &rate), &retry);
//! let driver = PaginationDriver::new(source, 100);
//! ```

mod rate_limit;
mod retry;

pub use rate_limit::{RateLimited, RateLimiter};
pub use retry::Retrying;

#[cfg(test)]
mod tests;
