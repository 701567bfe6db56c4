//! Host-populated factories for agent and memory kinds.
//!
//! The configuration document names implementations by a string kind (the
//! `type` field). Rather than resolving those strings reflectively, the host
//! registers a factory per kind at startup; the orchestrator only ever looks
//! identifiers up in these registries. Declarations without a kind (for
//! example template-only agents) resolve through the registry's default
//! factory when one is installed.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::agent::Agent;
use crate::config::{AgentDecl, ConfigError, MemoryDecl};
use crate::memory::MemoryNode;

/// Factory producing an agent from its declaration.
pub type AgentFactory =
    Arc<dyn Fn(&AgentDecl) -> Result<Arc<dyn Agent>, ConfigError> + Send + Sync>;

/// Factory producing a memory node from its declaration.
pub type MemoryFactory =
    Arc<dyn Fn(&MemoryDecl) -> Result<Arc<dyn MemoryNode>, ConfigError> + Send + Sync>;

/// Registry of agent kinds.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use cogflow::agent::Agent;
/// use cogflow::registry::AgentRegistry;
/// # struct LlmAgent;
/// # impl LlmAgent { fn from_template(_t: Option<&str>) -> Self { LlmAgent } }
/// # #[async_trait::async_trait]
/// # impl Agent for LlmAgent {
/// #     async fn execute(&self, _: &cogflow::types::Context)
/// #         -> Result<serde_json::Value, cogflow::agent::AgentError> { unimplemented!() }
/// # }
///
/// let registry = AgentRegistry::new()
///     .register("llm", |decl| {
///         Ok(Arc::new(LlmAgent::from_template(decl.template_file.as_deref())) as Arc<dyn Agent>)
///     });
/// ```
#[derive(Clone, Default)]
pub struct AgentRegistry {
    factories: FxHashMap<String, AgentFactory>,
    default_factory: Option<AgentFactory>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for a kind, replacing any previous registration.
    #[must_use]
    pub fn register<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&AgentDecl) -> Result<Arc<dyn Agent>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Installs the factory used for declarations that carry no kind.
    #[must_use]
    pub fn with_default<F>(mut self, factory: F) -> Self
    where
        F: Fn(&AgentDecl) -> Result<Arc<dyn Agent>, ConfigError> + Send + Sync + 'static,
    {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    pub(crate) fn resolve(&self, decl: &AgentDecl) -> Result<Arc<dyn Agent>, ConfigError> {
        match &decl.kind {
            Some(kind) => {
                let factory = self.factories.get(kind).ok_or_else(|| {
                    ConfigError::UnknownKind {
                        kind: kind.clone(),
                        id: decl.id.clone(),
                    }
                })?;
                factory(decl)
            }
            None => {
                let factory = self
                    .default_factory
                    .as_ref()
                    .ok_or_else(|| ConfigError::NoDefaultFactory {
                        id: decl.id.clone(),
                    })?;
                factory(decl)
            }
        }
    }
}

/// Registry of memory-node kinds; same resolution rules as [`AgentRegistry`].
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    factories: FxHashMap<String, MemoryFactory>,
    default_factory: Option<MemoryFactory>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&MemoryDecl) -> Result<Arc<dyn MemoryNode>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn with_default<F>(mut self, factory: F) -> Self
    where
        F: Fn(&MemoryDecl) -> Result<Arc<dyn MemoryNode>, ConfigError> + Send + Sync + 'static,
    {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    pub(crate) fn resolve(&self, decl: &MemoryDecl) -> Result<Arc<dyn MemoryNode>, ConfigError> {
        match &decl.kind {
            Some(kind) => {
                let factory = self.factories.get(kind).ok_or_else(|| {
                    ConfigError::UnknownKind {
                        kind: kind.clone(),
                        id: decl.id.clone(),
                    }
                })?;
                factory(decl)
            }
            None => {
                let factory = self
                    .default_factory
                    .as_ref()
                    .ok_or_else(|| ConfigError::NoDefaultFactory {
                        id: decl.id.clone(),
                    })?;
                factory(decl)
            }
        }
    }
}
