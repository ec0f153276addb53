//! Document store module
//!
//! Abstracts the one store capability the pager needs: a bounded, sorted,
//! filtered query against a single collection.
//!
//! # Implementations
//!
//! - `MongoStore` - MongoDB via the official driver
//! - `MemoryStore` - in-process vector of documents

mod memory;
mod mongo;
mod types;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use types::{DocumentStore, Filter, FindQuery, SortSpec};
