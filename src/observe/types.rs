//! Query event types
//!
//! Events carry serialized copies of the request and its outcome. They
//! never hold references into pages or documents.

use crate::error::{Error, ErrorKind};
use crate::types::JsonValue;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::time::Duration;

/// How a query ended
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Store answered
    Success {
        /// Serialized reply
        reply: JsonValue,
        /// Round trip time
        duration: Duration,
    },
    /// Query failed
    Failure {
        /// Error category
        kind: ErrorKind,
        /// Error message
        message: String,
        /// Time until the failure surfaced
        duration: Duration,
    },
}

/// One observable step of a query's lifecycle
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEvent {
    /// Identifier shared by the start and end events of one query
    pub request_id: u64,
    /// Operation name (e.g. `find`, `ping`)
    pub operation: String,
    /// `database.collection`
    pub namespace: String,
    /// Serialized request
    pub request: JsonValue,
    /// Outcome, absent on start events
    pub outcome: Option<QueryOutcome>,
    /// When this event was produced
    pub timestamp: DateTime<Utc>,
}

impl QueryEvent {
    /// Create a start event
    pub fn started(
        request_id: u64,
        operation: impl Into<String>,
        namespace: impl Into<String>,
        request: JsonValue,
    ) -> Self {
        Self {
            request_id,
            operation: operation.into(),
            namespace: namespace.into(),
            request,
            outcome: None,
            timestamp: Utc::now(),
        }
    }

    /// Derive the success event for this query
    #[must_use]
    pub fn succeeded(&self, reply: JsonValue, duration: Duration) -> Self {
        self.finish(QueryOutcome::Success { reply, duration })
    }

    /// Derive the failure event for this query
    #[must_use]
    pub fn failed(&self, error: &Error, duration: Duration) -> Self {
        self.failed_with(error.kind(), error.to_string(), duration)
    }

    /// Derive a failure event from an already classified error
    #[must_use]
    pub fn failed_with(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        self.finish(QueryOutcome::Failure {
            kind,
            message: message.into(),
            duration,
        })
    }

    fn finish(&self, outcome: QueryOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            timestamp: Utc::now(),
            ..self.clone()
        }
    }

    /// Lifecycle phase label
    pub fn phase(&self) -> &'static str {
        match self.outcome {
            None => "started",
            Some(QueryOutcome::Success { .. }) => "succeeded",
            Some(QueryOutcome::Failure { .. }) => "failed",
        }
    }

    /// Serialize for log output
    pub fn to_json(&self) -> JsonValue {
        let mut value = json!({
            "requestId": self.request_id,
            "operation": self.operation,
            "namespace": self.namespace,
            "phase": self.phase(),
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match &self.outcome {
            None => {
                value["request"] = self.request.clone();
            }
            Some(QueryOutcome::Success { reply, duration }) => {
                value["durationMs"] = json!(duration.as_millis() as u64);
                value["reply"] = reply.clone();
            }
            Some(QueryOutcome::Failure {
                kind,
                message,
                duration,
            }) => {
                value["durationMs"] = json!(duration.as_millis() as u64);
                value["error"] = json!({ "kind": kind.as_str(), "message": message });
            }
        }

        value
    }
}
