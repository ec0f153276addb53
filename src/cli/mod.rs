//! CLI module
//!
//! Command-line interface for paging through a collection.
//!
//! # Commands
//!
//! - `check` - Ping the store
//! - `fetch` - Fetch one page after an optional key
//! - `walk` - Page through the whole collection, checkpointing as it goes

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
