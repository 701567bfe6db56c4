//! The node-transition state machine.
//!
//! Resolution is a pure function of the declared rule, the current node's
//! own recorded output, and the run's accumulated visit counts. It never
//! inspects other nodes' outputs, the wider context, or wall-clock time.

use std::sync::Arc;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::flow::{FlowDefinition, TransitionRule};
use crate::state::ExecutionState;

/// Outcome of resolving a node's transition.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// Continue at the named node.
    Goto(String),
    /// Terminate per an `End` rule, carrying its result path for the caller
    /// to resolve against the current node's own output.
    Finish(Option<String>),
    /// Terminate with no declared path (decision ceiling with no fallback);
    /// the caller returns the last produced output.
    Halt,
}

/// Mid-run routing failures, fatal for the current run.
#[derive(Debug, Error, Diagnostic)]
pub enum TransitionError {
    /// The current node has no declared transition rule.
    #[error("node '{node}' has no transition rule")]
    #[diagnostic(
        code(cogflow::transition::missing_rule),
        help("Add a transition entry for the node, or end the flow before it.")
    )]
    MissingRule { node: String },

    /// A decision could not resolve and the rule declares no fallback.
    #[error("decision key '{key}' on node '{node}' did not resolve and no fallback is declared")]
    #[diagnostic(
        code(cogflow::transition::unresolved_decision),
        help("Add a 'default' route to the decision table or make the agent emit the key.")
    )]
    UnresolvedDecision { node: String, key: String },
}

/// Computes the next node for the current one, given its declared rule and
/// all accumulated outputs.
#[derive(Clone)]
pub struct TransitionResolver {
    flow: Arc<FlowDefinition>,
}

impl TransitionResolver {
    #[must_use]
    pub fn new(flow: Arc<FlowDefinition>) -> Self {
        Self { flow }
    }

    /// Resolves the successor of `current`.
    ///
    /// Decision rules read `decision_key` from the current node's own output
    /// in the run context, normalize it to a lowercase string, and look it
    /// up in the rule's normalized route table. Missing output, missing key,
    /// non-scalar values, and unmatched values all route to the fallback.
    /// When `max_visits` is set, the per-node visit counter is incremented
    /// first and the fallback is taken once the post-increment count exceeds
    /// the ceiling.
    pub fn next(
        &self,
        current: &str,
        state: &mut ExecutionState,
    ) -> Result<NextStep, TransitionError> {
        let rule = self
            .flow
            .rule(current)
            .ok_or_else(|| TransitionError::MissingRule {
                node: current.to_string(),
            })?;

        match rule {
            TransitionRule::Direct { next } => Ok(NextStep::Goto(next.clone())),
            TransitionRule::End { result_path } => Ok(NextStep::Finish(result_path.clone())),
            TransitionRule::Decision {
                key,
                routes,
                fallback,
                max_visits,
            } => {
                if let Some(limit) = max_visits {
                    let visits = state.bump_visit(current);
                    if visits > *limit {
                        tracing::warn!(
                            node = %current,
                            visits,
                            limit,
                            "decision visit ceiling exceeded, taking fallback"
                        );
                        return Ok(match fallback {
                            Some(target) => NextStep::Goto(target.clone()),
                            None => NextStep::Halt,
                        });
                    }
                }

                let decision_value = state
                    .context()
                    .get(current)
                    .and_then(|output| output.get(key))
                    .and_then(normalize_decision_value);

                match decision_value {
                    Some(value) => match routes.get(&value) {
                        Some(target) => Ok(NextStep::Goto(target.clone())),
                        None => {
                            tracing::warn!(
                                node = %current,
                                decision_key = %key,
                                value = %value,
                                "decision value has no route, taking fallback"
                            );
                            self.take_fallback(current, key, fallback)
                        }
                    },
                    None => {
                        tracing::warn!(
                            node = %current,
                            decision_key = %key,
                            "decision key missing from node output, taking fallback"
                        );
                        self.take_fallback(current, key, fallback)
                    }
                }
            }
        }
    }

    fn take_fallback(
        &self,
        node: &str,
        key: &str,
        fallback: &Option<String>,
    ) -> Result<NextStep, TransitionError> {
        match fallback {
            Some(target) => Ok(NextStep::Goto(target.clone())),
            None => Err(TransitionError::UnresolvedDecision {
                node: node.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

/// Lowercase string form of a scalar decision value.
///
/// Integral floats collapse to their integer form (`1.0` routes like `1`,
/// matching the route-key normalization at compile time). Arrays and objects
/// are not meaningful routing keys and are treated as missing.
fn normalize_decision_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_lowercase()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(canonical_number(n)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn canonical_number(n: &serde_json::Number) -> String {
    if n.as_i64().is_none() && n.as_u64().is_none() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f == f.trunc() && f.abs() < i64::MAX as f64 {
                return (f as i64).to_string();
            }
        }
    }
    n.to_string()
}
