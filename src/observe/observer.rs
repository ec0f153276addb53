//! Hook dispatch
//!
//! The observer owns the installed hooks and the housekeeping exclusion
//! set. It is injected into whatever issues queries; there is no global
//! registration.

use super::hooks::QueryHook;
use super::types::QueryEvent;
use crate::config::ObservabilityConfig;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Operations treated as connection housekeeping by default
pub const DEFAULT_EXCLUDED_OPERATIONS: [&str; 2] = ["endSessions", "ping"];

/// Dispatches query events to hooks
#[derive(Clone)]
pub struct Observer {
    /// Installed hooks, called in order
    hooks: Vec<Arc<dyn QueryHook>>,
    /// Operation names never dispatched
    excluded: Arc<HashSet<String>>,
    /// Source of request identifiers
    next_id: Arc<AtomicU64>,
}

impl Observer {
    /// Create an observer with no hooks and the default exclusion set
    pub fn new() -> Self {
        Self {
            hooks: Vec::new(),
            excluded: Arc::new(
                DEFAULT_EXCLUDED_OPERATIONS
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            ),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create an observer from configuration, installing `hook` when enabled
    pub fn from_config(config: &ObservabilityConfig, hook: Arc<dyn QueryHook>) -> Self {
        let observer = Self::new().with_excluded(config.excluded_operations.iter().cloned());
        if config.enabled {
            observer.with_hook(hook)
        } else {
            observer
        }
    }

    /// Add a hook
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Replace the exclusion set
    #[must_use]
    pub fn with_excluded<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = Arc::new(operations.into_iter().map(Into::into).collect());
        self
    }

    /// Whether events for `operation` are suppressed
    pub fn is_excluded(&self, operation: &str) -> bool {
        self.excluded.contains(operation)
    }

    /// Number of installed hooks
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Allocate an identifier for a new query
    pub fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Dispatch a start event
    pub fn query_started(&self, event: &QueryEvent) {
        self.dispatch(event, |hook, e| hook.on_query_start(e));
    }

    /// Dispatch a success event
    pub fn query_succeeded(&self, event: &QueryEvent) {
        self.dispatch(event, |hook, e| hook.on_query_success(e));
    }

    /// Dispatch a failure event
    pub fn query_failed(&self, event: &QueryEvent) {
        self.dispatch(event, |hook, e| hook.on_query_failure(e));
    }

    fn dispatch(&self, event: &QueryEvent, call: impl Fn(&dyn QueryHook, &QueryEvent)) {
        if self.hooks.is_empty() || self.is_excluded(&event.operation) {
            return;
        }

        for hook in &self.hooks {
            // A failing hook must not take the query down with it
            if catch_unwind(AssertUnwindSafe(|| call(hook.as_ref(), event))).is_err() {
                warn!(
                    "Query hook panicked on {} {} #{}",
                    event.operation,
                    event.phase(),
                    event.request_id
                );
            }
        }
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("hooks", &self.hooks.len())
            .field("excluded", &self.excluded)
            .finish_non_exhaustive()
    }
}
