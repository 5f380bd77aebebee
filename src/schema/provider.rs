//! Schema normalization for adapter-family tool declarations.

use serde_json::{Map, Value};

use crate::adapter::AdapterFamily;

/// Normalize a JSON schema for the tool-declaration shape a family expects.
pub fn normalize_schema_for_family(schema: &Value, family: AdapterFamily) -> Value {
    match family {
        AdapterFamily::FunctionCall | AdapterFamily::ToolUse => ensure_object_root(schema),
        AdapterFamily::FunctionDeclaration => strip_unsupported_keywords(schema),
        AdapterFamily::TextFallback => schema.clone(),
    }
}

/// Tool parameter roots must be objects carrying a `properties` map.
fn ensure_object_root(schema: &Value) -> Value {
    let mut root = match schema {
        Value::Object(obj) if is_object_schema(schema) || !obj.contains_key("type") => obj.clone(),
        _ => Map::new(),
    };
    root.insert("type".into(), Value::String("object".into()));
    root.entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    Value::Object(root)
}

fn strip_unsupported_keywords(schema: &Value) -> Value {
    match schema {
        Value::Object(obj) => {
            let mut normalized = Map::new();
            for (key, value) in obj {
                if matches!(key.as_str(), "additionalProperties" | "$schema") {
                    continue;
                }
                let next = if key == "properties" {
                    strip_property_map(value)
                } else {
                    strip_unsupported_keywords(value)
                };
                normalized.insert(key.clone(), next);
            }
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_unsupported_keywords).collect()),
        _ => schema.clone(),
    }
}

// Property names are user data; only their schemas are normalized.
fn strip_property_map(properties: &Value) -> Value {
    match properties {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(name, schema)| (name.clone(), strip_unsupported_keywords(schema)))
                .collect(),
        ),
        other => other.clone(),
    }
}

// `["object", "null"]` still describes an object root.
fn is_object_schema(value: &Value) -> bool {
    match value.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(tags)) => tags.iter().any(|t| t == "object"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_call_root_gains_properties() {
        let normalized = normalize_schema_for_family(&json!({}), AdapterFamily::FunctionCall);
        assert_eq!(normalized, json!({ "type": "object", "properties": {} }));
    }

    #[test]
    fn non_object_root_is_replaced() {
        let normalized =
            normalize_schema_for_family(&json!({ "type": "string" }), AdapterFamily::ToolUse);
        assert_eq!(normalized["type"], "object");
    }

    #[test]
    fn nullable_object_root_keeps_its_fields() {
        let descriptor = crate::schema::translate(&json!({
            "type": ["object", "null"],
            "properties": { "entity": { "type": "string" } },
            "required": ["entity"]
        }));
        for family in [AdapterFamily::FunctionCall, AdapterFamily::ToolUse] {
            let normalized = normalize_schema_for_family(&descriptor.to_json_schema(), family);
            assert_eq!(normalized["type"], "object");
            assert_eq!(normalized["properties"]["entity"]["type"], "string");
            assert_eq!(normalized["required"], json!(["entity"]));
        }
    }

    #[test]
    fn declaration_family_strips_additional_properties() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "additionalProperties": { "type": "boolean" },
                "nested": { "type": "object", "additionalProperties": false }
            },
            "additionalProperties": false
        });
        let normalized = normalize_schema_for_family(&schema, AdapterFamily::FunctionDeclaration);
        assert!(normalized.get("additionalProperties").is_none());
        assert!(normalized.get("$schema").is_none());
        assert!(normalized["properties"]["nested"]
            .get("additionalProperties")
            .is_none());
        // a property that happens to be called additionalProperties is kept
        assert!(normalized["properties"].get("additionalProperties").is_some());
    }
}
