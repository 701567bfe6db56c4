//! Memory-node collaborators and the query/update hook coordinator.
//!
//! A memory node can be queried for context before an agent runs and updated
//! with new information after it runs. Queries mutate the memory node's own
//! internal readable store (exposed via [`MemoryNode::store`]); the
//! orchestrator merges all stores into the shared context under each memory
//! node's identifier after the query phase.
//!
//! Failure semantics are asymmetric: a failed query degrades (absent memory
//! content is a valid empty result), a failed update propagates (a silently
//! dropped write breaks the consistency expectations of later runs).

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::types::Context;

/// Failure reported by a memory-node backend.
#[derive(Debug, Error, Diagnostic)]
pub enum MemoryError {
    /// Backend-specific failure (search index, persistence layer, ...).
    #[error("memory backend error: {0}")]
    #[diagnostic(code(cogflow::memory::backend))]
    Backend(String),

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(cogflow::memory::serde_json))]
    Serde(#[from] serde_json::Error),
}

/// Which hook phase a failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Query,
    Update,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Query => write!(f, "query"),
            HookPhase::Update => write!(f, "update"),
        }
    }
}

/// A memory hook failure, annotated with the binding and trigger involved.
#[derive(Debug, Error, Diagnostic)]
#[error("memory {phase} hook '{memory_id}' failed for node '{agent_id}': {source}")]
#[diagnostic(code(cogflow::memory::hook))]
pub struct MemoryHookError {
    pub memory_id: String,
    pub agent_id: String,
    pub phase: HookPhase,
    #[source]
    pub source: MemoryError,
}

/// A named collaborator holding retrievable memory.
///
/// Implementations own their readable store and are shared across runs, so
/// mutation happens behind interior mutability. `keys` restricts which
/// context/state keys the hook may read; `None` means unrestricted.
#[async_trait]
pub trait MemoryNode: Send + Sync {
    /// Retrieve content relevant to the current context into the store.
    async fn query_memory(&self, keys: Option<&[String]>, ctx: &Context)
    -> Result<(), MemoryError>;

    /// Absorb new information from the current context.
    async fn update_memory(&self, keys: Option<&[String]>, ctx: &Context)
    -> Result<(), MemoryError>;

    /// Snapshot of the node's readable store.
    fn store(&self) -> Value;
}

/// One memory node together with its resolved hook bindings.
#[derive(Clone)]
pub struct MemoryBinding {
    pub id: String,
    pub node: Arc<dyn MemoryNode>,
    /// Agent identifiers that trigger a query before their execution.
    pub query_before: Vec<String>,
    pub query_keys: Option<Vec<String>>,
    /// Agent identifiers that trigger an update after their execution.
    pub update_after: Vec<String>,
    pub update_keys: Option<Vec<String>>,
}

impl MemoryBinding {
    #[must_use]
    pub fn new(id: impl Into<String>, node: Arc<dyn MemoryNode>) -> Self {
        Self {
            id: id.into(),
            node,
            query_before: Vec::new(),
            query_keys: None,
            update_after: Vec::new(),
            update_keys: None,
        }
    }

    #[must_use]
    pub fn query_before(mut self, agents: Vec<String>) -> Self {
        self.query_before = agents;
        self
    }

    #[must_use]
    pub fn query_keys(mut self, keys: Option<Vec<String>>) -> Self {
        self.query_keys = keys;
        self
    }

    #[must_use]
    pub fn update_after(mut self, agents: Vec<String>) -> Self {
        self.update_after = agents;
        self
    }

    #[must_use]
    pub fn update_keys(mut self, keys: Option<Vec<String>>) -> Self {
        self.update_keys = keys;
        self
    }
}

/// Coordinates memory hooks around node executions.
///
/// Built once per orchestrator from the declared bindings; the reverse
/// lookup maps preserve declaration order, which is the only ordering
/// guarantee between memory nodes sharing a trigger.
#[derive(Clone, Default)]
pub struct MemoryManager {
    bindings: Vec<MemoryBinding>,
    before: FxHashMap<String, Vec<usize>>,
    after: FxHashMap<String, Vec<usize>>,
}

impl MemoryManager {
    #[must_use]
    pub fn new(bindings: Vec<MemoryBinding>) -> Self {
        let mut before: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut after: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (idx, binding) in bindings.iter().enumerate() {
            for agent in &binding.query_before {
                before.entry(agent.clone()).or_default().push(idx);
            }
            for agent in &binding.update_after {
                after.entry(agent.clone()).or_default().push(idx);
            }
        }
        Self {
            bindings,
            before,
            after,
        }
    }

    /// True when no memory nodes are bound at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether any query hook is registered for this agent.
    #[must_use]
    pub fn has_query_hooks(&self, agent_id: &str) -> bool {
        self.before.contains_key(agent_id)
    }

    /// Runs every query hook registered for `agent_id`, in declaration
    /// order. Failures are logged and skipped: the run proceeds with no
    /// retrieved memory.
    pub async fn query_before(&self, agent_id: &str, ctx: &Context) {
        let Some(indices) = self.before.get(agent_id) else {
            return;
        };
        for &idx in indices {
            let binding = &self.bindings[idx];
            if let Err(source) = binding
                .node
                .query_memory(binding.query_keys.as_deref(), ctx)
                .await
            {
                let err = MemoryHookError {
                    memory_id: binding.id.clone(),
                    agent_id: agent_id.to_string(),
                    phase: HookPhase::Query,
                    source,
                };
                tracing::warn!(
                    error = %err,
                    "memory query failed, continuing without retrieved content"
                );
            }
        }
    }

    /// Runs every update hook registered for `agent_id`, in declaration
    /// order. The first failure propagates.
    pub async fn update_after(&self, agent_id: &str, ctx: &Context) -> Result<(), MemoryHookError> {
        let Some(indices) = self.after.get(agent_id) else {
            return Ok(());
        };
        for &idx in indices {
            let binding = &self.bindings[idx];
            binding
                .node
                .update_memory(binding.update_keys.as_deref(), ctx)
                .await
                .map_err(|source| MemoryHookError {
                    memory_id: binding.id.clone(),
                    agent_id: agent_id.to_string(),
                    phase: HookPhase::Update,
                    source,
                })?;
        }
        Ok(())
    }

    /// Collective view of all memory stores, in declaration order:
    /// memory node identifier -> store snapshot.
    #[must_use]
    pub fn memory_view(&self) -> Vec<(String, Value)> {
        self.bindings
            .iter()
            .map(|b| (b.id.clone(), b.node.store()))
            .collect()
    }
}
