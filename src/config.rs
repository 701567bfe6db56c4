//! The `cog:` flow configuration document.
//!
//! Documents are authored in YAML (JSON is accepted as well when loading
//! from a file path) and describe agent declarations, the flow graph with
//! its transition shorthands, and optional memory bindings. This module only
//! materializes the document; reference validation and rule compilation
//! happen in [`crate::flow`] and [`crate::cog`].
//!
//! # Transition shorthands
//!
//! ```yaml
//! cog:
//!   agents:
//!     - id: intake
//!       type: llm
//!     - id: triage
//!       type: llm
//!     - id: escalation
//!       type: llm
//!     - id: archivist
//!       type: llm
//!   flow:
//!     start: intake
//!     transitions:
//!       intake: triage                 # Direct
//!       triage:                        # Decision
//!         decision:
//!           escalate: escalation
//!           archive: archivist
//!           default: archivist
//!         max_visits: 3
//!       escalation:
//!         end: true                    # End, return the whole context
//!       archivist:
//!         end: summary.text            # End, dot-path into archivist's output
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating a flow configuration.
///
/// All configuration errors surface at construction time; a successfully
/// built [`crate::cog::Cog`] never raises one mid-run.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file at {path}: {source}")]
    #[diagnostic(code(cogflow::config::file_read))]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration document.
    #[error("failed to parse {format} config: {source}")]
    #[diagnostic(code(cogflow::config::parse))]
    Parse {
        format: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Unsupported configuration file extension.
    #[error("unsupported config file format: {message}")]
    #[diagnostic(
        code(cogflow::config::unsupported_format),
        help("Use a .yaml, .yml, or .json file.")
    )]
    UnsupportedFormat { message: String },

    /// No configuration source was provided to the builder.
    #[error("no flow document provided")]
    #[diagnostic(
        code(cogflow::config::missing_document),
        help("Call document(), config_str(), or config_path() before build().")
    )]
    MissingDocument,

    /// `flow.start` is absent or empty.
    #[error("flow.start must be set")]
    #[diagnostic(code(cogflow::config::missing_start))]
    MissingStart,

    /// A node identifier does not resolve to a declared agent.
    #[error("unknown node '{node}' referenced from {site}")]
    #[diagnostic(
        code(cogflow::config::unresolved_reference),
        help("Every start node, transition key, and transition target must name a declared agent.")
    )]
    UnresolvedReference { node: String, site: String },

    /// Two agents were declared with the same identifier.
    #[error("duplicate agent declaration: '{id}'")]
    #[diagnostic(code(cogflow::config::duplicate_agent))]
    DuplicateAgent { id: String },

    /// An agent entry carries neither a `type` nor a `template_file`.
    #[error("agent '{id}' needs a type or a template_file to be resolvable")]
    #[diagnostic(code(cogflow::config::agent_unresolvable))]
    AgentUnresolvable { id: String },

    /// A declared kind has no registered factory.
    #[error("no factory registered for kind '{kind}' (declaration '{id}')")]
    #[diagnostic(
        code(cogflow::config::unknown_kind),
        help("Register the kind on the AgentRegistry/MemoryRegistry before building.")
    )]
    UnknownKind { kind: String, id: String },

    /// A declaration without a kind was given, but no default factory exists.
    #[error("declaration '{id}' has no kind and the registry has no default factory")]
    #[diagnostic(code(cogflow::config::no_default_factory))]
    NoDefaultFactory { id: String },

    /// A registered factory refused to build an instance.
    #[error("factory failed for declaration '{id}': {message}")]
    #[diagnostic(code(cogflow::config::factory))]
    Factory { id: String, message: String },

    /// A decision transition carries more than one candidate decision key.
    #[error("transition for '{node}' has multiple candidate decision keys: {keys:?}")]
    #[diagnostic(
        code(cogflow::config::ambiguous_decision),
        help("A decision transition may carry exactly one key besides 'end' and 'max_visits'.")
    )]
    AmbiguousDecision { node: String, keys: Vec<String> },

    /// A transition entry has an invalid shape.
    #[error("invalid transition for '{node}': {message}")]
    #[diagnostic(code(cogflow::config::invalid_transition))]
    InvalidTransition { node: String, message: String },
}

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct CogDocument {
    pub cog: CogSection,
}

/// The `cog:` object: agents, flow, memory bindings, trail toggle.
#[derive(Debug, Clone, Deserialize)]
pub struct CogSection {
    #[serde(default)]
    pub agents: Vec<AgentDecl>,
    pub flow: FlowSection,
    #[serde(default)]
    pub memory: Vec<MemoryDecl>,
    /// Defaults to `true`; a builder-level override wins when both are set.
    #[serde(default)]
    pub trail_logging: Option<bool>,
}

/// One declared agent node.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentDecl {
    pub id: String,
    /// Registry kind resolving to an executable agent implementation.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Named prompt/template resource for template-driven agents.
    #[serde(default)]
    pub template_file: Option<String>,
}

/// The flow graph: start node plus per-node transition specs.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowSection {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub transitions: BTreeMap<String, TransitionSpec>,
}

/// Raw transition entry, prior to rule compilation.
///
/// Either a bare string (Direct shorthand) or a table interpreted by
/// [`crate::flow::FlowDefinition`] as an `End` or `Decision` rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransitionSpec {
    Direct(String),
    Table(BTreeMap<String, serde_yaml::Value>),
}

/// One declared memory node with its hook bindings.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryDecl {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
    /// Agent identifiers that trigger a query before their execution.
    #[serde(default)]
    pub query_before: Option<OneOrMany>,
    /// Keys the query hook is permitted to read; `None` means unrestricted.
    #[serde(default)]
    pub query_keys: Option<Vec<String>>,
    /// Agent identifiers that trigger an update after their execution.
    #[serde(default)]
    pub update_after: Option<OneOrMany>,
    #[serde(default)]
    pub update_keys: Option<Vec<String>>,
}

impl MemoryDecl {
    /// Query triggers, normalized to a list.
    #[must_use]
    pub fn query_triggers(&self) -> Vec<String> {
        self.query_before.as_ref().map(OneOrMany::to_vec).unwrap_or_default()
    }

    /// Update triggers, normalized to a list.
    #[must_use]
    pub fn update_triggers(&self) -> Vec<String> {
        self.update_after.as_ref().map(OneOrMany::to_vec).unwrap_or_default()
    }
}

/// A single identifier or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(id) => vec![id.clone()],
            OneOrMany::Many(ids) => ids.clone(),
        }
    }
}

impl CogDocument {
    /// Parses a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            format: "YAML",
            source: Box::new(e),
        })
    }

    /// Loads a document from a file, dispatching on the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&content),
            Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                format: "JSON",
                source: Box::new(e),
            }),
            _ => Err(ConfigError::UnsupportedFormat {
                message: "file extension must be .yaml, .yml, or .json".to_string(),
            }),
        }
    }
}
