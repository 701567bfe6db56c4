//! Execution-trail recording.
//!
//! The trail is an append-only, in-memory log of per-node execution records.
//! Entries are created on every successful or failed node execution and are
//! never mutated afterwards; their lifetime is bounded to one run unless the
//! caller retains a copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded node execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtTrailEntry {
    /// Identifier of the executed node.
    pub agent_id: String,
    /// The node's output, opaque to the recorder.
    pub output: Value,
    /// Captured at record time; non-decreasing across entries within a run.
    pub timestamp: DateTime<Utc>,
    /// 1-based, strictly increasing per reset.
    pub execution_order: u64,
    /// Free-form annotation supplied by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Present when the execution failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Append-only recorder of [`ThoughtTrailEntry`] values.
///
/// A disabled recorder accepts `record` calls as no-ops and always returns
/// an empty trail, indistinguishable from "nothing happened yet".
#[derive(Debug, Clone)]
pub struct TrailRecorder {
    enabled: bool,
    entries: Vec<ThoughtTrailEntry>,
    next_order: u64,
}

impl TrailRecorder {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Vec::new(),
            next_order: 1,
        }
    }

    /// Whether this recorder keeps entries.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Appends an entry, assigning the next execution order and a timestamp.
    ///
    /// No-op when the recorder is disabled.
    pub fn record(
        &mut self,
        agent_id: impl Into<String>,
        output: Value,
        notes: Option<String>,
        error: Option<String>,
    ) {
        if !self.enabled {
            return;
        }
        self.entries.push(ThoughtTrailEntry {
            agent_id: agent_id.into(),
            output,
            timestamp: Utc::now(),
            execution_order: self.next_order,
            notes,
            error,
        });
        self.next_order += 1;
    }

    /// Returns a copy of the recorded trail, in execution order.
    #[must_use]
    pub fn trail(&self) -> Vec<ThoughtTrailEntry> {
        self.entries.clone()
    }

    /// Drops all entries and restarts execution ordering at 1.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_order = 1;
    }
}
