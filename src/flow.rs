//! Flow definition and transition-rule compilation.
//!
//! A [`FlowDefinition`] is built once per orchestrator from the parsed
//! configuration document. Compilation interprets the transition shorthands,
//! lowercase-normalizes decision routes, and validates every node reference
//! so that traversal never encounters an undeclared identifier. A flow with
//! no reachable `End` rule is accepted with a warning; authors may intend
//! external cancellation.

use rustc_hash::{FxHashMap, FxHashSet};
use serde_yaml::Value as YamlValue;

use crate::config::{CogSection, ConfigError, TransitionSpec};

/// Reserved transition-table keys that are never decision keys.
const RESERVED_KEYS: [&str; 2] = ["end", "max_visits"];

/// The policy attached to a node describing how to pick its successor.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionRule {
    /// Unconditional hop to the named node.
    Direct { next: String },
    /// Terminates the flow. `result_path` is `None` to return the whole
    /// context, or a dot-path into the current node's own output.
    End { result_path: Option<String> },
    /// Routes on a field of the current node's own output.
    Decision {
        /// Field name read from the node's output.
        key: String,
        /// Lowercase-normalized decision value -> next node.
        routes: FxHashMap<String, String>,
        /// Taken when the key is absent, the value has no route, or the
        /// visit ceiling is exceeded. `None` means "terminate with no path"
        /// on ceiling exhaustion and is an error on an unresolved value.
        fallback: Option<String>,
        /// Per-rule visit ceiling; `None` means unlimited.
        max_visits: Option<u32>,
    },
}

/// Immutable flow graph: the start node plus per-node transition rules.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    start: String,
    transitions: FxHashMap<String, TransitionRule>,
}

impl FlowDefinition {
    /// Compiles and validates the flow out of a parsed `cog:` section.
    ///
    /// Every identifier referenced by the flow (start, transition keys,
    /// direct targets, decision routes, fallbacks) must name a declared
    /// agent; violations surface here, never during traversal.
    pub fn from_section(section: &CogSection) -> Result<Self, ConfigError> {
        let declared: FxHashSet<&str> = section.agents.iter().map(|a| a.id.as_str()).collect();

        let start = section
            .flow
            .start
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingStart)?
            .to_string();
        require_declared(&declared, &start, "flow.start")?;

        let mut transitions = FxHashMap::default();
        for (node, spec) in &section.flow.transitions {
            require_declared(&declared, node, "flow.transitions")?;
            let rule = compile_rule(node, spec)?;
            validate_rule_targets(&declared, node, &rule)?;
            transitions.insert(node.clone(), rule);
        }

        let flow = Self { start, transitions };
        if !flow.has_reachable_end() {
            tracing::warn!(
                start = %flow.start,
                "flow has no reachable End transition; a cyclic flow without \
                 visit ceilings will run until externally cancelled"
            );
        }
        Ok(flow)
    }

    /// The identifier of the first node to execute.
    #[must_use]
    pub fn start(&self) -> &str {
        &self.start
    }

    /// The transition rule declared for a node, if any.
    #[must_use]
    pub fn rule(&self, node: &str) -> Option<&TransitionRule> {
        self.transitions.get(node)
    }

    /// Walks the graph from the start node and reports whether any reachable
    /// node carries an `End` rule.
    fn has_reachable_end(&self) -> bool {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut stack = vec![self.start.as_str()];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            match self.transitions.get(node) {
                Some(TransitionRule::End { .. }) => return true,
                Some(TransitionRule::Direct { next }) => stack.push(next),
                Some(TransitionRule::Decision { routes, fallback, .. }) => {
                    stack.extend(routes.values().map(String::as_str));
                    if let Some(fb) = fallback {
                        stack.push(fb);
                    }
                }
                None => {}
            }
        }
        false
    }
}

fn require_declared(
    declared: &FxHashSet<&str>,
    node: &str,
    site: &str,
) -> Result<(), ConfigError> {
    if declared.contains(node) {
        Ok(())
    } else {
        Err(ConfigError::UnresolvedReference {
            node: node.to_string(),
            site: site.to_string(),
        })
    }
}

fn validate_rule_targets(
    declared: &FxHashSet<&str>,
    node: &str,
    rule: &TransitionRule,
) -> Result<(), ConfigError> {
    let site = format!("transition for '{node}'");
    match rule {
        TransitionRule::Direct { next } => require_declared(declared, next, &site),
        TransitionRule::End { .. } => Ok(()),
        TransitionRule::Decision { routes, fallback, .. } => {
            for target in routes.values() {
                require_declared(declared, target, &site)?;
            }
            if let Some(fb) = fallback {
                require_declared(declared, fb, &site)?;
            }
            Ok(())
        }
    }
}

/// Interprets one raw transition spec into a [`TransitionRule`].
fn compile_rule(node: &str, spec: &TransitionSpec) -> Result<TransitionRule, ConfigError> {
    let table = match spec {
        TransitionSpec::Direct(next) => {
            return Ok(TransitionRule::Direct { next: next.clone() });
        }
        TransitionSpec::Table(table) => table,
    };

    let candidates: Vec<&String> = table
        .keys()
        .filter(|k| !RESERVED_KEYS.contains(&k.as_str()))
        .collect();

    if let Some(end) = table.get("end") {
        if !candidates.is_empty() {
            return Err(ConfigError::InvalidTransition {
                node: node.to_string(),
                message: "'end' cannot be combined with a decision key".to_string(),
            });
        }
        if table.contains_key("max_visits") {
            return Err(ConfigError::InvalidTransition {
                node: node.to_string(),
                message: "'end' cannot be combined with 'max_visits'".to_string(),
            });
        }
        let result_path = match end {
            YamlValue::Bool(true) => None,
            YamlValue::String(path) if path.is_empty() => None,
            YamlValue::String(path) => Some(path.clone()),
            _ => {
                return Err(ConfigError::InvalidTransition {
                    node: node.to_string(),
                    message: "'end' must be true or a dot-path string".to_string(),
                });
            }
        };
        return Ok(TransitionRule::End { result_path });
    }

    match candidates.as_slice() {
        [] => Err(ConfigError::InvalidTransition {
            node: node.to_string(),
            message: "transition table needs 'end' or exactly one decision key".to_string(),
        }),
        [key] => {
            let max_visits = match table.get("max_visits") {
                None => None,
                Some(v) => Some(parse_max_visits(node, v)?),
            };
            let (routes, fallback) = parse_decision_table(node, key, &table[*key])?;
            Ok(TransitionRule::Decision {
                key: (*key).clone(),
                routes,
                fallback,
                max_visits,
            })
        }
        many => Err(ConfigError::AmbiguousDecision {
            node: node.to_string(),
            keys: many.iter().map(|k| (*k).clone()).collect(),
        }),
    }
}

fn parse_max_visits(node: &str, value: &YamlValue) -> Result<u32, ConfigError> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ConfigError::InvalidTransition {
            node: node.to_string(),
            message: "'max_visits' must be a non-negative integer".to_string(),
        })
}

/// Parses a decision-value map, lowercasing route keys and splitting out the
/// reserved `default` entry as the fallback.
fn parse_decision_table(
    node: &str,
    key: &str,
    value: &YamlValue,
) -> Result<(FxHashMap<String, String>, Option<String>), ConfigError> {
    let mapping = value.as_mapping().ok_or_else(|| ConfigError::InvalidTransition {
        node: node.to_string(),
        message: format!("decision key '{key}' must map values to node identifiers"),
    })?;

    let mut routes = FxHashMap::default();
    let mut fallback = None;
    for (raw_value, raw_target) in mapping {
        let route = scalar_to_route_key(raw_value).ok_or_else(|| {
            ConfigError::InvalidTransition {
                node: node.to_string(),
                message: format!("decision key '{key}' has a non-scalar value entry"),
            }
        })?;
        let target = raw_target
            .as_str()
            .ok_or_else(|| ConfigError::InvalidTransition {
                node: node.to_string(),
                message: format!("route '{route}' must name a node identifier"),
            })?
            .to_string();
        if route == "default" {
            fallback = Some(target);
        } else {
            routes.insert(route, target);
        }
    }
    Ok((routes, fallback))
}

/// Lowercase string form of a scalar YAML key (string, bool, or number).
///
/// Integral floats collapse to their integer form so a route authored as
/// `1.0` matches a decision value of `1`, and vice versa.
fn scalar_to_route_key(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.to_lowercase()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Number(n) => Some(canonical_number_key(n)),
        _ => None,
    }
}

fn canonical_number_key(n: &serde_yaml::Number) -> String {
    if n.as_i64().is_none() && n.as_u64().is_none() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f == f.trunc() && f.abs() < i64::MAX as f64 {
                return (f as i64).to_string();
            }
        }
    }
    n.to_string()
}
