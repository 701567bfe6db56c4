//! Per-node execution with bounded retries.
//!
//! The runner conflates "agent raised" and "agent produced nothing useful":
//! a flaky upstream call and a degenerate empty response are both recoverable
//! by immediate re-invocation. Backoff, if any, belongs to the agent layer.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::agent::{Agent, AgentError};
use crate::types::{Context, is_empty_output};

/// Default attempt budget per node execution.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Errors from an exhausted node execution, fatal for the run.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentRunError {
    /// The final attempt raised; the original agent error propagates
    /// unchanged so callers can distinguish root causes.
    #[error(transparent)]
    #[diagnostic(code(cogflow::runner::agent))]
    Agent(#[from] AgentError),

    /// Every attempt returned empty output without raising.
    #[error("agent '{node}' exhausted {attempts} attempts without valid output")]
    #[diagnostic(
        code(cogflow::runner::exhausted),
        help("The agent kept returning empty output; check its prompt or inputs.")
    )]
    Exhausted { node: String, attempts: u32 },
}

/// Invokes one agent node with a bounded number of immediate retries.
#[derive(Debug, Clone)]
pub struct AgentRunner {
    max_attempts: u32,
}

impl Default for AgentRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl AgentRunner {
    /// Creates a runner with the given attempt budget (minimum 1).
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs the agent until it yields non-empty output or the budget is
    /// exhausted.
    ///
    /// Per-attempt traces are advisory only and never affect control flow.
    pub async fn run(
        &self,
        node_id: &str,
        agent: &dyn Agent,
        ctx: &Context,
    ) -> Result<Value, AgentRunError> {
        for attempt in 1..=self.max_attempts {
            match agent.execute(ctx).await {
                Ok(output) if !is_empty_output(&output) => {
                    tracing::debug!(node = %node_id, attempt, "agent execution succeeded");
                    return Ok(output);
                }
                Ok(_) => {
                    tracing::debug!(
                        node = %node_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "agent returned empty output"
                    );
                }
                Err(err) => {
                    tracing::debug!(
                        node = %node_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "agent execution failed"
                    );
                    if attempt == self.max_attempts {
                        return Err(AgentRunError::Agent(err));
                    }
                }
            }
        }
        Err(AgentRunError::Exhausted {
            node: node_id.to_string(),
            attempts: self.max_attempts,
        })
    }
}
