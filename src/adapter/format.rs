//! Shape-probing and formatting helpers shared by adapters.

use serde_json::{Map, Value};
use tracing::warn;

/// Follow `path` through objects and arrays; numeric segments index arrays.
pub(crate) fn probe<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(obj) => obj.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// First path in `paths` that resolves to a non-null value.
pub(crate) fn probe_any<'a>(value: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| probe(value, path))
        .find(|found| !found.is_null())
}

/// Structured input for a call. Serialized arguments that fail to parse become
/// an empty object so the remaining calls are still extracted.
pub(crate) fn parse_arguments(raw: Option<&Value>, tool: &str) -> Value {
    match raw {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(Value::String(s)) if s.trim().is_empty() => Value::Object(Map::new()),
        Some(Value::String(s)) => serde_json::from_str(s).unwrap_or_else(|err| {
            warn!(tool, error = %err, "malformed tool arguments, using empty input");
            Value::Object(Map::new())
        }),
        Some(other) => other.clone(),
    }
}

/// Correlation id from the wire, or a fresh one when absent.
pub(crate) fn correlation_id(raw: Option<&Value>) -> String {
    match raw.and_then(Value::as_str).map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => generate_correlation_id(),
    }
}

pub(crate) fn generate_correlation_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

pub(crate) fn non_empty_str<'a>(value: Option<&'a Value>) -> Option<&'a str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Plain text for a JSON value.
///
/// Strings are taken as-is and arrays of `{type: "text", text}` blocks are
/// joined. Anything else is serialized.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(is_text_block) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}

fn is_text_block(item: &Value) -> bool {
    item.get("text").and_then(Value::as_str).is_some()
        && item
            .get("type")
            .and_then(Value::as_str)
            .map_or(true, |t| t == "text")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn probe_walks_objects_and_arrays() {
        let raw = json!({ "choices": [{ "message": { "content": "hi" } }] });
        assert_eq!(
            probe(&raw, &["choices", "0", "message", "content"]),
            Some(&json!("hi"))
        );
        assert_eq!(probe(&raw, &["choices", "1", "message"]), None);
        assert_eq!(probe(&raw, &["choices", "x"]), None);
    }

    #[test]
    fn probe_any_skips_nulls() {
        let raw = json!({ "a": null, "b": 1 });
        assert_eq!(probe_any(&raw, &[&["a"], &["b"]]), Some(&json!(1)));
    }

    #[test]
    fn arguments_degrade_to_empty_object() {
        assert_eq!(parse_arguments(Some(&json!("{not json")), "t"), json!({}));
        assert_eq!(parse_arguments(Some(&json!("")), "t"), json!({}));
        assert_eq!(parse_arguments(None, "t"), json!({}));
        assert_eq!(parse_arguments(Some(&json!(r#"{"q":1}"#)), "t"), json!({ "q": 1 }));
        assert_eq!(parse_arguments(Some(&json!({ "q": 1 })), "t"), json!({ "q": 1 }));
    }

    #[test]
    fn missing_ids_are_generated() {
        let id = correlation_id(None);
        assert!(id.starts_with("call_"));
        assert_ne!(id, correlation_id(Some(&json!(""))));
        assert_eq!(correlation_id(Some(&json!("toolu_1"))), "toolu_1");
    }

    #[test]
    fn text_blocks_are_joined() {
        let blocks = json!([{ "type": "text", "text": "a" }, { "text": "b" }]);
        assert_eq!(value_to_text(&blocks), "a\nb");
        assert_eq!(value_to_text(&json!({ "k": 1 })), r#"{"k":1}"#);
        assert_eq!(value_to_text(&json!([])), "");
    }
}
