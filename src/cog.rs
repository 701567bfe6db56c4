//! The Cog orchestrator.
//!
//! `Cog` composes the flow definition, the resolved agent handles, the
//! memory-hook coordinator, the retry runner, and the trail recorder into a
//! single drive-to-completion loop. Construction performs all validation;
//! after [`CogBuilder::build`] succeeds, the orchestrator is immutable and
//! safe to share across concurrent runs.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::agent::Agent;
use crate::config::{CogDocument, ConfigError};
use crate::flow::FlowDefinition;
use crate::memory::{MemoryBinding, MemoryHookError, MemoryManager};
use crate::registry::{AgentRegistry, MemoryRegistry};
use crate::resolver::{NextStep, TransitionError, TransitionResolver};
use crate::runner::{AgentRunError, AgentRunner};
use crate::state::ExecutionState;
use crate::trail::ThoughtTrailEntry;
use crate::types::Context;
use crate::utils::lookup_path;

/// Fatal mid-run errors; all unwind out of [`Cog::run`] unmodified so
/// hosting code can decide retry/alerting policy.
#[derive(Debug, Error, Diagnostic)]
pub enum CogError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Agent(#[from] AgentRunError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryHookError),

    /// The optional hard step ceiling tripped.
    #[error("run exceeded the configured step ceiling of {ceiling} steps")]
    #[diagnostic(
        code(cogflow::cog::step_ceiling),
        help("Raise the ceiling, or add max_visits to cycle-closing decisions.")
    )]
    StepCeilingExceeded { ceiling: u64 },

    /// Traversal reached a node with no resolved agent handle. Construction
    /// validation makes this unreachable for well-formed flows; it is kept
    /// instead of a panic.
    #[error("no agent handle resolved for node '{node}'")]
    #[diagnostic(code(cogflow::cog::unknown_node))]
    UnknownNode { node: String },
}

enum DocumentSource {
    Document(Box<CogDocument>),
    Str(String),
    Path(PathBuf),
}

/// Builder for [`Cog`]; collects the document source, registries, and
/// overrides, then validates everything in [`build`](Self::build).
#[derive(Default)]
pub struct CogBuilder {
    source: Option<DocumentSource>,
    agents: AgentRegistry,
    memory: MemoryRegistry,
    trail_logging: Option<bool>,
    step_ceiling: Option<u64>,
    max_attempts: Option<u32>,
}

impl CogBuilder {
    /// Uses an already-parsed document.
    #[must_use]
    pub fn document(mut self, doc: CogDocument) -> Self {
        self.source = Some(DocumentSource::Document(Box::new(doc)));
        self
    }

    /// Parses the given YAML string at build time.
    #[must_use]
    pub fn config_str(mut self, content: impl Into<String>) -> Self {
        self.source = Some(DocumentSource::Str(content.into()));
        self
    }

    /// Loads the document from a file at build time.
    #[must_use]
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(DocumentSource::Path(path.into()));
        self
    }

    /// The agent-kind registry used to resolve declarations.
    #[must_use]
    pub fn agents(mut self, registry: AgentRegistry) -> Self {
        self.agents = registry;
        self
    }

    /// The memory-kind registry used to resolve declarations.
    #[must_use]
    pub fn memory(mut self, registry: MemoryRegistry) -> Self {
        self.memory = registry;
        self
    }

    /// Overrides the document's `trail_logging` flag; the builder value wins
    /// when both are present.
    #[must_use]
    pub fn trail_logging(mut self, enabled: bool) -> Self {
        self.trail_logging = Some(enabled);
        self
    }

    /// Installs a hard per-run step ceiling as a runaway-loop safety net.
    /// Off by default, matching the engine's warn-only stance on flows with
    /// no reachable End.
    #[must_use]
    pub fn step_ceiling(mut self, ceiling: u64) -> Self {
        self.step_ceiling = Some(ceiling);
        self
    }

    /// Retry budget per node execution (default 3).
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Validates the document, resolves every agent and memory handle, and
    /// assembles the orchestrator. Fails fast: no error from this set can
    /// surface mid-run.
    pub fn build(self) -> Result<Cog, ConfigError> {
        let doc = match self.source {
            Some(DocumentSource::Document(doc)) => *doc,
            Some(DocumentSource::Str(content)) => CogDocument::from_yaml(&content)?,
            Some(DocumentSource::Path(path)) => CogDocument::from_path(&path)?,
            None => return Err(ConfigError::MissingDocument),
        };
        let section = doc.cog;

        let flow = Arc::new(FlowDefinition::from_section(&section)?);

        let mut agents: FxHashMap<String, Arc<dyn Agent>> = FxHashMap::default();
        for decl in &section.agents {
            if decl.kind.is_none() && decl.template_file.is_none() {
                return Err(ConfigError::AgentUnresolvable {
                    id: decl.id.clone(),
                });
            }
            if agents.contains_key(&decl.id) {
                return Err(ConfigError::DuplicateAgent {
                    id: decl.id.clone(),
                });
            }
            agents.insert(decl.id.clone(), self.agents.resolve(decl)?);
        }

        let mut bindings = Vec::with_capacity(section.memory.len());
        for decl in &section.memory {
            for trigger in decl.query_triggers().iter().chain(decl.update_triggers().iter()) {
                if !agents.contains_key(trigger) {
                    return Err(ConfigError::UnresolvedReference {
                        node: trigger.clone(),
                        site: format!("memory '{}'", decl.id),
                    });
                }
            }
            if agents.contains_key(&decl.id) {
                tracing::warn!(
                    memory = %decl.id,
                    "memory identifier collides with an agent identifier; \
                     the agent's output will overwrite the merged store"
                );
            }
            let node = self.memory.resolve(decl)?;
            bindings.push(
                MemoryBinding::new(decl.id.clone(), node)
                    .query_before(decl.query_triggers())
                    .query_keys(decl.query_keys.clone())
                    .update_after(decl.update_triggers())
                    .update_keys(decl.update_keys.clone()),
            );
        }

        let trail_logging = self
            .trail_logging
            .or(section.trail_logging)
            .unwrap_or(true);

        Ok(Cog {
            resolver: TransitionResolver::new(Arc::clone(&flow)),
            flow,
            agents,
            memory: MemoryManager::new(bindings),
            runner: self
                .max_attempts
                .map(AgentRunner::new)
                .unwrap_or_default(),
            trail_logging,
            step_ceiling: self.step_ceiling,
            last_trail: Mutex::new(Vec::new()),
        })
    }
}

/// The orchestrator: immutable after construction, one traversal per
/// [`run`](Self::run) call.
pub struct Cog {
    flow: Arc<FlowDefinition>,
    resolver: TransitionResolver,
    agents: FxHashMap<String, Arc<dyn Agent>>,
    memory: MemoryManager,
    runner: AgentRunner,
    trail_logging: bool,
    step_ceiling: Option<u64>,
    last_trail: Mutex<Vec<ThoughtTrailEntry>>,
}

impl std::fmt::Debug for Cog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cog")
            .field("flow", &self.flow)
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("runner", &self.runner)
            .field("trail_logging", &self.trail_logging)
            .field("step_ceiling", &self.step_ceiling)
            .finish_non_exhaustive()
    }
}

impl Cog {
    #[must_use]
    pub fn builder() -> CogBuilder {
        CogBuilder::default()
    }

    /// The compiled flow definition.
    #[must_use]
    pub fn flow(&self) -> &FlowDefinition {
        &self.flow
    }

    /// Defensive copy of the most recently completed (or failed) run's
    /// trail, for external introspection and debugging.
    #[must_use]
    pub fn tracked_trail(&self) -> Vec<ThoughtTrailEntry> {
        match self.last_trail.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drives the flow from its start node to a terminal transition.
    ///
    /// `seed` merges into the shared context before traversal begins; seed
    /// keys colliding with node identifiers are overwritten by later node
    /// outputs. Returns the whole context or the `End` rule's extracted
    /// value; a failed run returns no partial result.
    #[instrument(skip(self, seed), fields(run_id = %Uuid::new_v4(), start = %self.flow.start()), err)]
    pub async fn run(&self, seed: Context) -> Result<Value, CogError> {
        let mut state = ExecutionState::new(seed, self.trail_logging);
        let result = self.traverse(&mut state).await;

        let trail = state.recorder().trail();
        match self.last_trail.lock() {
            Ok(mut guard) => *guard = trail,
            Err(poisoned) => *poisoned.into_inner() = trail,
        }
        result
    }

    async fn traverse(&self, state: &mut ExecutionState) -> Result<Value, CogError> {
        let mut current = self.flow.start().to_string();
        let mut last_output = Value::Null;
        let mut steps: u64 = 0;

        loop {
            // Defensive default: an empty current node stops the traversal.
            if current.is_empty() {
                tracing::debug!("empty current node, returning last output");
                return Ok(last_output);
            }

            if let Some(ceiling) = self.step_ceiling {
                steps += 1;
                if steps > ceiling {
                    return Err(CogError::StepCeilingExceeded { ceiling });
                }
            }

            let agent = self
                .agents
                .get(&current)
                .ok_or_else(|| CogError::UnknownNode {
                    node: current.clone(),
                })?;

            // Memory query hooks fire first; their stores merge into the
            // context under each memory node's identifier.
            if self.memory.has_query_hooks(&current) {
                self.memory.query_before(&current, state.context()).await;
                for (memory_id, snapshot) in self.memory.memory_view() {
                    state.context_mut().insert(memory_id, snapshot);
                }
            }

            let output = match self.runner.run(&current, agent.as_ref(), state.context()).await {
                Ok(output) => output,
                Err(err) => {
                    state
                        .recorder_mut()
                        .record(&current, Value::Null, None, Some(err.to_string()));
                    return Err(err.into());
                }
            };

            tracing::info!(node = %current, "node executed");
            state.recorder_mut().record(&current, output.clone(), None, None);
            state.context_mut().insert(current.clone(), output.clone());
            last_output = output;

            self.memory.update_after(&current, state.context()).await?;

            match self.resolver.next(&current, state)? {
                NextStep::Goto(next) => current = next,
                NextStep::Halt => {
                    tracing::debug!(node = %current, "no route declared, returning last output");
                    return Ok(last_output);
                }
                NextStep::Finish(result_path) => {
                    return Ok(self.extract_result(
                        &current,
                        result_path.as_deref(),
                        state.context(),
                    ));
                }
            }
        }
    }

    /// Resolves an `End` rule's result against the run context: the whole
    /// context when no path is set, otherwise a dot-path into the *current*
    /// node's own output. Paths into other nodes' outputs are not supported
    /// and behave as "not found".
    fn extract_result(&self, node: &str, result_path: Option<&str>, ctx: &Context) -> Value {
        let Some(path) = result_path else {
            let mut whole = Map::new();
            let mut keys: Vec<&String> = ctx.keys().collect();
            keys.sort();
            for key in keys {
                whole.insert(key.clone(), ctx[key].clone());
            }
            return Value::Object(whole);
        };

        match ctx.get(node).and_then(|output| lookup_path(output, path)) {
            Some(found) => found.clone(),
            None => {
                tracing::warn!(
                    node = %node,
                    path = %path,
                    "result path not found in final node output"
                );
                Value::Null
            }
        }
    }
}
