//! Function-declaration family: Gemini-style `functionCall` parts.

use serde_json::{json, Value};
use tracing::warn;

use super::format::{correlation_id, non_empty_str, parse_arguments, probe_any};
use super::{AdapterFamily, PreparedCapability, ProviderAdapter, ProviderToolList, ToolChoice};
use crate::types::{CanonicalToolCall, CanonicalToolResult, ContentPart, Message, Role};

const PART_PATHS: &[&[&str]] = &[
    &["candidates", "0", "content", "parts"],
    &["content", "parts"],
    &["parts"],
];

/// Adapter for providers that declare tools as `functionDeclarations`.
///
/// Calls carry no ids on the wire; correlation ids are generated.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionDeclarationAdapter;

fn parts(raw: &Value) -> &[Value] {
    match probe_any(raw, PART_PATHS) {
        Some(Value::Array(parts)) => parts,
        _ => &[],
    }
}

fn parse_function_call(call: &Value) -> Option<CanonicalToolCall> {
    let Some(name) = non_empty_str(call.get("name")) else {
        warn!("skipping functionCall without a name");
        return None;
    };
    Some(CanonicalToolCall::new(
        correlation_id(call.get("id")),
        name,
        parse_arguments(call.get("args"), name),
    ))
}

impl ProviderAdapter for FunctionDeclarationAdapter {
    fn family(&self) -> AdapterFamily {
        AdapterFamily::FunctionDeclaration
    }

    fn convert_capabilities(&self, capabilities: &[PreparedCapability]) -> ProviderToolList {
        let declarations: Vec<Value> = capabilities
            .iter()
            .map(|cap| {
                json!({
                    "name": cap.normalized_name,
                    "description": cap.description,
                    "parameters": cap.parameters_for(self.family()),
                })
            })
            .collect();
        let tools = if declarations.is_empty() {
            Vec::new()
        } else {
            vec![json!({ "functionDeclarations": declarations })]
        };
        ProviderToolList::Native {
            tools,
            capability_count: capabilities.len(),
        }
    }

    fn extract_calls(&self, raw: &Value) -> Vec<CanonicalToolCall> {
        let from_parts: Vec<CanonicalToolCall> = parts(raw)
            .iter()
            .filter_map(|part| part.get("functionCall"))
            .filter_map(parse_function_call)
            .collect();
        if !from_parts.is_empty() {
            return from_parts;
        }
        match raw.get("functionCalls") {
            Some(Value::Array(calls)) => calls.iter().filter_map(parse_function_call).collect(),
            _ => Vec::new(),
        }
    }

    fn extract_text(&self, raw: &Value) -> String {
        let text: String = parts(raw)
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if text.is_empty() {
            raw.get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        } else {
            text
        }
    }

    fn format_results(&self, results: &[CanonicalToolResult]) -> Message {
        Message::tool_results(results)
    }

    fn render_messages(&self, messages: &[Message]) -> Vec<Value> {
        let mut contents = Vec::with_capacity(messages.len());
        for msg in messages {
            let (role, parts): (&str, Vec<Value>) = match msg.role {
                Role::System | Role::User => ("user", vec![json!({ "text": msg.text() })]),
                Role::Assistant => (
                    "model",
                    msg.content
                        .iter()
                        .filter_map(|part| match part {
                            ContentPart::Text { text } if !text.is_empty() => {
                                Some(json!({ "text": text }))
                            }
                            ContentPart::ToolCall(call) => Some(json!({
                                "functionCall": { "name": call.normalized_name, "args": call.input }
                            })),
                            _ => None,
                        })
                        .collect(),
                ),
                Role::Tool => (
                    "function",
                    msg.tool_result_parts()
                        .into_iter()
                        .map(|result| {
                            let key = if result.is_error { "error" } else { "content" };
                            json!({
                                "functionResponse": {
                                    "name": result.normalized_name,
                                    "response": { key: result.content },
                                }
                            })
                        })
                        .collect(),
                ),
            };
            if !parts.is_empty() {
                contents.push(json!({ "role": role, "parts": parts }));
            }
        }
        contents
    }

    fn tool_choice(&self, choice: &ToolChoice) -> Option<Value> {
        let config = match choice {
            ToolChoice::Auto => json!({ "mode": "AUTO" }),
            ToolChoice::None => json!({ "mode": "NONE" }),
            ToolChoice::Required => json!({ "mode": "ANY" }),
            ToolChoice::Function(name) => {
                json!({ "mode": "ANY", "allowedFunctionNames": [name] })
            }
        };
        Some(json!({ "functionCallingConfig": config }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::translate;
    use pretty_assertions::assert_eq;

    #[test]
    fn wraps_declarations_and_strips_unsupported_keywords() {
        let cap = PreparedCapability::new(
            "lookup",
            "Look up",
            translate(&json!({
                "type": "object",
                "properties": { "gene": { "type": "string" } },
                "additionalProperties": false
            })),
        );
        let list = FunctionDeclarationAdapter.convert_capabilities(&[cap]);
        let decls = &list.native_tools()[0]["functionDeclarations"];
        assert_eq!(decls[0]["name"], "lookup");
        assert!(decls[0]["parameters"].get("additionalProperties").is_none());
        assert_eq!(list.capability_count(), 1);

        let empty = FunctionDeclarationAdapter.convert_capabilities(&[]);
        assert!(empty.native_tools().is_empty());
    }

    #[test]
    fn extracts_candidate_parts() {
        let raw = json!({
            "candidates": [{ "content": { "role": "model", "parts": [
                { "text": "Checking." },
                { "functionCall": { "name": "lookup", "args": { "gene": "TP53" } } },
                { "functionCall": { "name": "lookup" } }
            ] } }]
        });
        let calls = FunctionDeclarationAdapter.extract_calls(&raw);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].input, json!({ "gene": "TP53" }));
        assert_eq!(calls[1].input, json!({}));
        assert_ne!(calls[0].correlation_id, calls[1].correlation_id);
        assert_eq!(FunctionDeclarationAdapter.extract_text(&raw), "Checking.");
    }

    #[test]
    fn extracts_flat_function_calls() {
        let raw = json!({ "functionCalls": [{ "name": "lookup", "args": {} }], "text": "hi" });
        assert_eq!(FunctionDeclarationAdapter.extract_calls(&raw).len(), 1);
        assert_eq!(FunctionDeclarationAdapter.extract_text(&raw), "hi");
        assert!(FunctionDeclarationAdapter.extract_calls(&json!({ "candidates": [] })).is_empty());
    }

    #[test]
    fn renders_function_responses() {
        let call = CanonicalToolCall::new("c1", "lookup", json!({ "gene": "X" }));
        let wire = FunctionDeclarationAdapter.render_messages(&[
            Message::user("q"),
            Message::invocation("", &[call]),
            Message::tool_results(&[CanonicalToolResult::failure("c1", "lookup", "down")]),
        ]);
        assert_eq!(wire[1]["role"], "model");
        assert_eq!(wire[1]["parts"][0]["functionCall"]["name"], "lookup");
        assert_eq!(
            wire[2]["parts"][0]["functionResponse"]["response"],
            json!({ "error": "down" })
        );
    }

    #[test]
    fn tool_choice_uses_calling_config() {
        let choice = FunctionDeclarationAdapter
            .tool_choice(&ToolChoice::Function("lookup".into()))
            .unwrap();
        assert_eq!(choice["functionCallingConfig"]["allowedFunctionNames"], json!(["lookup"]));
    }
}
