//! Core types shared across the cogflow engine.
//!
//! The engine's shared state is a flat map from node identifier to that
//! node's last output. Outputs are opaque [`serde_json::Value`]s; the engine
//! never interprets them beyond decision-key lookups and terminal result
//! extraction.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Shared per-run key/value state: node identifier -> last output.
///
/// Seed inputs merge into the same map before traversal begins, so seed keys
/// that collide with node identifiers are simply overwritten by later node
/// outputs.
pub type Context = FxHashMap<String, Value>;

/// Creates an empty [`Context`].
#[must_use]
pub fn new_context() -> Context {
    FxHashMap::default()
}

/// Returns `true` if an agent output counts as empty for retry purposes.
///
/// Both "agent failed" and "agent produced nothing useful" are treated as
/// transient by [`crate::runner::AgentRunner`]; this predicate defines the
/// second class: null, `false`, zero, the empty string, and empty
/// collections.
#[must_use]
pub fn is_empty_output(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_outputs() {
        for v in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(is_empty_output(&v), "{v} should be empty");
        }
    }

    #[test]
    fn non_empty_outputs() {
        for v in [json!(true), json!(1), json!("x"), json!([0]), json!({"k": null})] {
            assert!(!is_empty_output(&v), "{v} should be non-empty");
        }
    }
}
