//! Dot-path lookups into JSON values.
//!
//! Terminal `End` transitions may name a dot-separated path into the final
//! node's output (`"a.b"` selects `output["a"]["b"]`). Lookups only descend
//! through objects; an empty segment or a non-object intermediate yields
//! `None`.

use serde_json::Value;

/// Resolves a dot-separated path against a JSON value.
///
/// Returns `None` when any segment is missing, empty, or the cursor is not
/// an object at that point.
///
/// # Examples
///
/// ```rust
/// use cogflow::utils::lookup_path;
/// use serde_json::json;
///
/// let output = json!({"a": {"b": "VALUE", "c": "OTHER"}});
/// assert_eq!(lookup_path(&output, "a.b"), Some(&json!("VALUE")));
/// assert_eq!(lookup_path(&output, "a.missing"), None);
/// ```
#[must_use]
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        cursor = cursor.as_object()?.get(segment)?;
    }
    Some(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_lookup() {
        let v = json!({"a": {"b": {"c": 42}}});
        assert_eq!(lookup_path(&v, "a.b.c"), Some(&json!(42)));
        assert_eq!(lookup_path(&v, "a.b"), Some(&json!({"c": 42})));
    }

    #[test]
    fn missing_and_malformed_paths() {
        let v = json!({"a": 1});
        assert_eq!(lookup_path(&v, "b"), None);
        assert_eq!(lookup_path(&v, "a.b"), None, "cannot descend through a scalar");
        assert_eq!(lookup_path(&v, ""), None);
        assert_eq!(lookup_path(&v, "a..b"), None);
    }

    #[test]
    fn top_level_key() {
        let v = json!({"result": "ok"});
        assert_eq!(lookup_path(&v, "result"), Some(&json!("ok")));
    }
}
