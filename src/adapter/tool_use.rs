//! Tool-use family: Anthropic-style typed content blocks.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::format::{correlation_id, non_empty_str, parse_arguments, probe_any};
use super::{AdapterFamily, PreparedCapability, ProviderAdapter, ProviderToolList, ToolChoice};
use crate::types::{CanonicalToolCall, CanonicalToolResult, ContentPart, Message, Role};

const CONTENT_PATHS: &[&[&str]] = &[&["content"], &["message", "content"]];

/// Adapter for providers that return `tool_use` blocks in the response content.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolUseAdapter;

fn content_blocks(raw: &Value) -> &[Value] {
    if let Value::Array(blocks) = raw {
        return blocks;
    }
    match probe_any(raw, CONTENT_PATHS) {
        Some(Value::Array(blocks)) => blocks,
        _ => &[],
    }
}

fn block_type(block: &Value) -> Option<&str> {
    block.get("type").and_then(Value::as_str)
}

impl ProviderAdapter for ToolUseAdapter {
    fn family(&self) -> AdapterFamily {
        AdapterFamily::ToolUse
    }

    fn convert_capabilities(&self, capabilities: &[PreparedCapability]) -> ProviderToolList {
        let tools = capabilities
            .iter()
            .map(|cap| {
                json!({
                    "name": cap.normalized_name,
                    "description": cap.description,
                    "input_schema": cap.parameters_for(self.family()),
                })
            })
            .collect();
        ProviderToolList::Native {
            tools,
            capability_count: capabilities.len(),
        }
    }

    fn extract_calls(&self, raw: &Value) -> Vec<CanonicalToolCall> {
        content_blocks(raw)
            .iter()
            .filter(|block| block_type(block) == Some("tool_use"))
            .filter_map(|block| {
                let Some(name) = non_empty_str(block.get("name")) else {
                    warn!("skipping tool_use block without a name");
                    return None;
                };
                Some(CanonicalToolCall::new(
                    correlation_id(block.get("id")),
                    name,
                    parse_arguments(block.get("input"), name),
                ))
            })
            .collect()
    }

    fn extract_text(&self, raw: &Value) -> String {
        if let Some(Value::String(text)) = probe_any(raw, CONTENT_PATHS) {
            return text.clone();
        }
        content_blocks(raw)
            .iter()
            .filter(|block| block_type(block) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect()
    }

    fn format_results(&self, results: &[CanonicalToolResult]) -> Message {
        Message::tool_results(results)
    }

    fn render_messages(&self, messages: &[Message]) -> Vec<Value> {
        let mut rendered = Vec::with_capacity(messages.len());
        for msg in messages {
            match msg.role {
                Role::System => {
                    debug!("system message left out of tool-use transcript");
                }
                Role::User => rendered.push(json!({ "role": "user", "content": msg.text() })),
                Role::Assistant => {
                    let content: Vec<Value> = msg
                        .content
                        .iter()
                        .filter_map(|part| match part {
                            ContentPart::Text { text } if !text.is_empty() => {
                                Some(json!({ "type": "text", "text": text }))
                            }
                            ContentPart::ToolCall(call) => Some(json!({
                                "type": "tool_use",
                                "id": call.correlation_id,
                                "name": call.normalized_name,
                                "input": call.input,
                            })),
                            _ => None,
                        })
                        .collect();
                    if !content.is_empty() {
                        rendered.push(json!({ "role": "assistant", "content": content }));
                    }
                }
                // All results of a turn go back in one user message.
                Role::Tool => {
                    let blocks: Vec<Value> = msg
                        .tool_result_parts()
                        .into_iter()
                        .map(|result| {
                            json!({
                                "type": "tool_result",
                                "tool_use_id": result.correlation_id,
                                "content": result.content,
                                "is_error": result.is_error,
                            })
                        })
                        .collect();
                    if !blocks.is_empty() {
                        rendered.push(json!({ "role": "user", "content": blocks }));
                    }
                }
            }
        }
        rendered
    }

    fn tool_choice(&self, choice: &ToolChoice) -> Option<Value> {
        match choice {
            ToolChoice::Auto => Some(json!({ "type": "auto" })),
            ToolChoice::Required => Some(json!({ "type": "any" })),
            ToolChoice::None => None,
            ToolChoice::Function(name) => Some(json!({ "type": "tool", "name": name })),
        }
    }
}
