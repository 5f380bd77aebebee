//! Function-call family: OpenAI-compatible chat completions.

use serde_json::{json, Value};
use tracing::warn;

use super::format::{correlation_id, non_empty_str, parse_arguments, probe_any, value_to_text};
use super::{AdapterFamily, PreparedCapability, ProviderAdapter, ProviderToolList, ToolChoice};
use crate::types::{CanonicalToolCall, CanonicalToolResult, ContentPart, Message, Role};

const CALL_PATHS: &[&[&str]] = &[
    &["choices", "0", "message", "tool_calls"],
    &["message", "tool_calls"],
    &["tool_calls"],
];

// Pre-`tools` single-call shape.
const LEGACY_CALL_PATHS: &[&[&str]] = &[
    &["choices", "0", "message", "function_call"],
    &["function_call"],
];

const TEXT_PATHS: &[&[&str]] = &[
    &["choices", "0", "message", "content"],
    &["message", "content"],
    &["content"],
];

/// Adapter for providers that attach a `tool_calls` array to the primary choice.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionCallAdapter;

fn parse_call(call: &Value) -> Option<CanonicalToolCall> {
    let function = call.get("function").unwrap_or(call);
    let Some(name) = non_empty_str(function.get("name")) else {
        warn!("skipping function call without a name");
        return None;
    };
    Some(CanonicalToolCall::new(
        correlation_id(call.get("id")),
        name,
        parse_arguments(function.get("arguments"), name),
    ))
}

impl ProviderAdapter for FunctionCallAdapter {
    fn family(&self) -> AdapterFamily {
        AdapterFamily::FunctionCall
    }

    fn convert_capabilities(&self, capabilities: &[PreparedCapability]) -> ProviderToolList {
        let tools = capabilities
            .iter()
            .map(|cap| {
                json!({
                    "type": "function",
                    "function": {
                        "name": cap.normalized_name,
                        "description": cap.description,
                        "parameters": cap.parameters_for(self.family()),
                    }
                })
            })
            .collect();
        ProviderToolList::Native {
            tools,
            capability_count: capabilities.len(),
        }
    }

    fn extract_calls(&self, raw: &Value) -> Vec<CanonicalToolCall> {
        if let Some(Value::Array(calls)) = probe_any(raw, CALL_PATHS) {
            return calls.iter().filter_map(parse_call).collect();
        }
        probe_any(raw, LEGACY_CALL_PATHS)
            .and_then(parse_call)
            .into_iter()
            .collect()
    }

    fn extract_text(&self, raw: &Value) -> String {
        probe_any(raw, TEXT_PATHS)
            .map(value_to_text)
            .unwrap_or_default()
    }

    fn format_results(&self, results: &[CanonicalToolResult]) -> Message {
        Message::tool_results(results)
    }

    fn render_messages(&self, messages: &[Message]) -> Vec<Value> {
        let mut rendered = Vec::with_capacity(messages.len());
        for msg in messages {
            match msg.role {
                Role::Tool => {
                    for part in &msg.content {
                        if let ContentPart::ToolResult(result) = part {
                            rendered.push(json!({
                                "role": "tool",
                                "tool_call_id": result.correlation_id,
                                "content": result.content,
                            }));
                        }
                    }
                }
                Role::Assistant if !msg.tool_calls().is_empty() => {
                    let tool_calls: Vec<Value> = msg
                        .tool_calls()
                        .into_iter()
                        .map(|call| {
                            json!({
                                "id": call.correlation_id,
                                "type": "function",
                                "function": {
                                    "name": call.normalized_name,
                                    "arguments": call.input.to_string(),
                                }
                            })
                        })
                        .collect();
                    let text = msg.text();
                    rendered.push(json!({
                        "role": "assistant",
                        "content": if text.is_empty() { Value::Null } else { Value::String(text) },
                        "tool_calls": tool_calls,
                    }));
                }
                role => rendered.push(json!({ "role": role.to_string(), "content": msg.text() })),
            }
        }
        rendered
    }

    fn tool_choice(&self, choice: &ToolChoice) -> Option<Value> {
        Some(match choice {
            ToolChoice::Auto => json!("auto"),
            ToolChoice::None => json!("none"),
            ToolChoice::Required => json!("required"),
            ToolChoice::Function(name) => {
                json!({ "type": "function", "function": { "name": name } })
            }
        })
    }
}
