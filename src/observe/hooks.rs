//! Query hook trait and built-in hooks

use super::types::QueryEvent;
use std::sync::Mutex;
use tracing::info;

/// Receives query lifecycle events
///
/// Hooks observe already-issued requests and their results. They return
/// nothing and cannot change what the query does or returns.
pub trait QueryHook: Send + Sync {
    /// Called immediately before a query is issued
    fn on_query_start(&self, event: &QueryEvent);

    /// Called immediately after a query returned a result
    fn on_query_success(&self, event: &QueryEvent);

    /// Called immediately after a query failed
    fn on_query_failure(&self, event: &QueryEvent);
}

/// Format an event as indented key/value text
pub fn format_event(event: &QueryEvent) -> String {
    serde_json::to_string_pretty(&event.to_json()).unwrap_or_else(|e| {
        format!(
            "{} {} #{} (unformattable: {e})",
            event.operation,
            event.phase(),
            event.request_id
        )
    })
}

/// Hook that writes formatted events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook;

impl TracingHook {
    /// Create a tracing hook
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, event: &QueryEvent) {
        info!(
            target: "solidafy_pager::query",
            operation = %event.operation,
            request_id = event.request_id,
            phase = event.phase(),
            "{}",
            format_event(event)
        );
    }
}

impl QueryHook for TracingHook {
    fn on_query_start(&self, event: &QueryEvent) {
        self.emit(event);
    }

    fn on_query_success(&self, event: &QueryEvent) {
        self.emit(event);
    }

    fn on_query_failure(&self, event: &QueryEvent) {
        self.emit(event);
    }
}

/// Which hook method received an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCall {
    Start,
    Success,
    Failure,
}

/// Hook that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingHook {
    events: Mutex<Vec<(HookCall, QueryEvent)>>,
}

impl RecordingHook {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded calls in arrival order
    pub fn events(&self) -> Vec<(HookCall, QueryEvent)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded call kinds in arrival order
    pub fn calls(&self) -> Vec<HookCall> {
        self.events().into_iter().map(|(call, _)| call).collect()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn record(&self, call: HookCall, event: &QueryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((call, event.clone()));
        }
    }
}

impl QueryHook for RecordingHook {
    fn on_query_start(&self, event: &QueryEvent) {
        self.record(HookCall::Start, event);
    }

    fn on_query_success(&self, event: &QueryEvent) {
        self.record(HookCall::Success, event);
    }

    fn on_query_failure(&self, event: &QueryEvent) {
        self.record(HookCall::Failure, event);
    }
}
