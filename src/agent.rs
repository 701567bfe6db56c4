//! The agent collaborator contract.
//!
//! An agent is a black box: given the shared context, produce an output or
//! fail. Prompt rendering, model invocation, and output parsing all live
//! behind this trait; the engine only drives execution, retries, and
//! routing.

use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::types::Context;

/// A single executable agent node.
///
/// Implementations must be safe to call repeatedly: the retry wrapper may
/// re-invoke `execute` after a failure, and one instance is reused across
/// runs. Idempotency is not required, but a failed attempt must not corrupt
/// state outside the context the caller passes in.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::{Value, json};
/// use cogflow::agent::{Agent, AgentError};
/// use cogflow::types::Context;
///
/// struct ClassifierAgent;
///
/// #[async_trait]
/// impl Agent for ClassifierAgent {
///     async fn execute(&self, ctx: &Context) -> Result<Value, AgentError> {
///         let input = ctx
///             .get("intake")
///             .ok_or(AgentError::MissingInput { what: "intake" })?;
///         let decision = if input.to_string().contains("urgent") {
///             "escalate"
///         } else {
///             "archive"
///         };
///         Ok(json!({"decision": decision}))
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send + Sync {
    /// Execute this agent against the current shared context.
    async fn execute(&self, ctx: &Context) -> Result<Value, AgentError>;
}

/// Errors an agent may raise during execution.
///
/// These are treated as transient by the retry wrapper until the attempt
/// budget is exhausted, at which point the last error propagates unchanged.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    /// Expected input data is missing from the shared context.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(cogflow::agent::missing_input),
        help("Check that an upstream node or the run seed produced the required key.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service error.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(cogflow::agent::provider))]
    Provider { provider: String, message: String },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(cogflow::agent::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Any other agent-specific failure.
    #[error("{0}")]
    #[diagnostic(code(cogflow::agent::other))]
    Other(String),
}
