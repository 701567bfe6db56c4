//! Per-run execution state.
//!
//! The shared context, decision visit counters, and the trail recorder are
//! bundled into one value created fresh inside every [`crate::cog::Cog::run`]
//! call. The orchestrator itself stays immutable after construction, so
//! independent runs against one instance never share mutable state.

use rustc_hash::FxHashMap;

use crate::trail::TrailRecorder;
use crate::types::Context;

/// Ephemeral state owned exclusively by one run.
#[derive(Debug)]
pub struct ExecutionState {
    context: Context,
    visit_counts: FxHashMap<String, u32>,
    recorder: TrailRecorder,
}

impl ExecutionState {
    /// Creates fresh state seeded with the caller's initial inputs.
    #[must_use]
    pub fn new(seed: Context, trail_enabled: bool) -> Self {
        Self {
            context: seed,
            visit_counts: FxHashMap::default(),
            recorder: TrailRecorder::new(trail_enabled),
        }
    }

    /// Read access to the shared context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Write access to the shared context (single writer: the orchestrator).
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Increments and returns the visit count for a node's decision rule.
    pub fn bump_visit(&mut self, node: &str) -> u32 {
        let count = self.visit_counts.entry(node.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Current visit count for a node (0 if never visited).
    #[must_use]
    pub fn visits(&self, node: &str) -> u32 {
        self.visit_counts.get(node).copied().unwrap_or(0)
    }

    /// The run's trail recorder.
    #[must_use]
    pub fn recorder(&self) -> &TrailRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut TrailRecorder {
        &mut self.recorder
    }
}
