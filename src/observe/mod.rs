//! Observability module
//!
//! Intercepts every outbound query and its outcome for structured logging.
//!
//! # Overview
//!
//! - `QueryHook` - three-method hook interface (start, success, failure)
//! - `Observer` - dispatches events to hooks, skipping housekeeping operations
//! - `TracingHook` - formats events as indented text and logs them
//! - `RecordingHook` - keeps events in memory

mod hooks;
mod observer;
mod types;

pub use hooks::{format_event, HookCall, QueryHook, RecordingHook, TracingHook};
pub use observer::{Observer, DEFAULT_EXCLUDED_OPERATIONS};
pub use types::{QueryEvent, QueryOutcome};
