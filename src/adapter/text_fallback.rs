//! Text-fallback family: tools described in the system prompt, calls parsed
//! out of plain completion text.
//!
//! Recognized call forms, in order of preference:
//!
//! ````text
//! ```tool
//! {"tool": "pubmed_search", "arguments": {"query": "TP53"}}
//! ```
//!
//! <tool_call>{"name": "pubmed_search", "arguments": {"query": "TP53"}}</tool_call>
//! ````
//!
//! and, when neither is present, a bare JSON object carrying a `tool` key.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::format::{correlation_id, non_empty_str, parse_arguments, probe_any, value_to_text};
use super::{AdapterFamily, PreparedCapability, ProviderAdapter, ProviderToolList, ToolChoice};
use crate::schema::InputDescriptor;
use crate::types::{CanonicalToolCall, CanonicalToolResult, ContentPart, Message, Role};

const TEXT_PATHS: &[&[&str]] = &[
    &["choices", "0", "message", "content"],
    &["message", "content"],
    &["content"],
    &["response"],
    &["text"],
    &["output"],
];

const ARGUMENT_KEYS: [&str; 3] = ["arguments", "input", "parameters"];

fn fenced_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```tool(?:[_-]?call)?[ \t]*\r?\n?(.*?)```").expect("static pattern")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<tool[_-]?call>(.*?)</tool[_-]?call>").expect("static pattern")
    })
}

/// Adapter for providers without a native tool channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFallbackAdapter;

/// Raw completion text, wherever the provider put it.
fn completion_text(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        other => probe_any(other, TEXT_PATHS)
            .map(value_to_text)
            .unwrap_or_default(),
    }
}

fn call_from_object(obj: &Map<String, Value>) -> Option<CanonicalToolCall> {
    let function = obj.get("function").and_then(Value::as_object);
    let name = non_empty_str(obj.get("tool"))
        .or_else(|| non_empty_str(obj.get("name")))
        .or_else(|| function.and_then(|f| non_empty_str(f.get("name"))))?;
    let arguments = ARGUMENT_KEYS
        .iter()
        .find_map(|key| obj.get(*key))
        .or_else(|| function.and_then(|f| f.get("arguments")));
    Some(CanonicalToolCall::new(
        correlation_id(obj.get("id")),
        name,
        parse_arguments(arguments, name),
    ))
}

/// Calls in a JSON value: one object, an array of them, or a `tool_calls` wrapper.
fn calls_from_value(value: &Value) -> Vec<CanonicalToolCall> {
    match value {
        Value::Array(items) => items.iter().flat_map(calls_from_value).collect(),
        Value::Object(obj) => match obj.get("tool_calls") {
            Some(Value::Array(items)) => items.iter().flat_map(calls_from_value).collect(),
            _ => call_from_object(obj).into_iter().collect(),
        },
        _ => Vec::new(),
    }
}

// Bare JSON is only trusted with an explicit `tool` key or a name plus arguments.
fn looks_like_bare_call(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| {
        obj.contains_key("tool")
            || (obj.contains_key("name") && ARGUMENT_KEYS.iter().any(|k| obj.contains_key(*k)))
    })
}

fn strip_spans(text: &str, spans: &[Range<usize>]) -> String {
    let mut kept = Vec::new();
    let mut cursor = 0;
    for span in spans {
        let piece = text[cursor..span.start].trim();
        if !piece.is_empty() {
            kept.push(piece);
        }
        cursor = span.end;
    }
    let tail = text[cursor..].trim();
    if !tail.is_empty() {
        kept.push(tail);
    }
    kept.join("\n")
}

/// Split completion text into narrative text and tool calls.
pub fn parse_completion(text: &str) -> (String, Vec<CanonicalToolCall>) {
    let mut spans: Vec<(Range<usize>, &str)> = fenced_block_pattern()
        .captures_iter(text)
        .chain(tag_pattern().captures_iter(text))
        .filter_map(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str())))
        .collect();

    if !spans.is_empty() {
        spans.sort_by_key(|(span, _)| span.start);
        // a tag nested in a fence is the same call
        let mut accepted: Vec<(Range<usize>, &str)> = Vec::with_capacity(spans.len());
        for (span, inner) in spans {
            if accepted.last().is_some_and(|(prev, _)| span.start < prev.end) {
                continue;
            }
            accepted.push((span, inner));
        }

        let mut calls = Vec::new();
        for (_, inner) in &accepted {
            match serde_json::from_str::<Value>(inner.trim()) {
                Ok(value) => {
                    let parsed = calls_from_value(&value);
                    if parsed.is_empty() {
                        warn!("tool block did not contain a tool call");
                    }
                    calls.extend(parsed);
                }
                Err(err) => warn!(error = %err, "malformed JSON in tool block"),
            }
        }
        let ranges: Vec<Range<usize>> = accepted.into_iter().map(|(span, _)| span).collect();
        return (strip_spans(text, &ranges), calls);
    }

    parse_bare_json(text).unwrap_or_else(|| (text.trim().to_string(), Vec::new()))
}

fn parse_bare_json(text: &str) -> Option<(String, Vec<CanonicalToolCall>)> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let candidates = match &value {
            Value::Array(items) => items.iter().all(looks_like_bare_call),
            Value::Object(obj) if obj.contains_key("tool_calls") => true,
            other => looks_like_bare_call(other),
        };
        if candidates {
            let calls = calls_from_value(&value);
            if !calls.is_empty() {
                let narrative = value
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                return Some((narrative, calls));
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    if !looks_like_bare_call(&value) {
        return None;
    }
    let calls = calls_from_value(&value);
    if calls.is_empty() {
        return None;
    }
    Some((strip_spans(text, &[start..end + 1]), calls))
}

/// Prompt section describing the available tools.
fn render_tool_section(capabilities: &[PreparedCapability]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
    prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");
    prompt.push_str(
        "Use one block per call. After receiving tool results, answer the user directly.\n\n",
    );

    for cap in capabilities {
        prompt.push_str(&format!("### {}\n", cap.normalized_name));
        if !cap.description.is_empty() {
            prompt.push_str(&format!("{}\n", cap.description));
        }
        if let Some(fields) = cap.input.fields().filter(|f| !f.is_empty()) {
            prompt.push_str("**Parameters:**\n");
            for field in fields {
                let required = if field.required { " (required)" } else { "" };
                prompt.push_str(&format!(
                    "- `{}` ({}){}{}\n",
                    field.name,
                    field.descriptor.type_name(),
                    required,
                    describe(&field.descriptor)
                ));
            }
        }
        prompt.push('\n');
    }
    prompt
}

fn describe(descriptor: &InputDescriptor) -> String {
    let mut out = String::new();
    if let Some(description) = &descriptor.description {
        out.push_str(": ");
        out.push_str(description);
    }
    if let Some(values) = &descriptor.enumeration {
        let listed: Vec<String> = values.iter().map(value_to_text).collect();
        out.push_str(if out.is_empty() { ": one of " } else { " One of " });
        out.push_str(&listed.join(", "));
        out.push('.');
    }
    out
}

fn render_result(result: &CanonicalToolResult) -> String {
    if result.is_error {
        format!("[Tool '{}' failed]\n{}", result.normalized_name, result.content)
    } else {
        format!("[Tool '{}' returned]\n{}", result.normalized_name, result.content)
    }
}

fn render_call(call: &CanonicalToolCall) -> String {
    let payload = json!({ "tool": call.normalized_name, "arguments": call.input });
    format!("```tool\n{payload}\n```")
}

impl ProviderAdapter for TextFallbackAdapter {
    fn family(&self) -> AdapterFamily {
        AdapterFamily::TextFallback
    }

    fn convert_capabilities(&self, capabilities: &[PreparedCapability]) -> ProviderToolList {
        let text = if capabilities.is_empty() {
            String::new()
        } else {
            render_tool_section(capabilities)
        };
        ProviderToolList::Prose {
            text,
            capability_count: capabilities.len(),
        }
    }

    fn extract_calls(&self, raw: &Value) -> Vec<CanonicalToolCall> {
        let (_, calls) = parse_completion(&completion_text(raw));
        calls
    }

    fn extract_text(&self, raw: &Value) -> String {
        let (text, _) = parse_completion(&completion_text(raw));
        text
    }

    /// Results travel back as a plain user message.
    fn format_results(&self, results: &[CanonicalToolResult]) -> Message {
        let text = results
            .iter()
            .map(render_result)
            .collect::<Vec<_>>()
            .join("\n\n");
        Message::user(text)
    }

    fn render_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let mut pieces = Vec::new();
                for part in &msg.content {
                    match part {
                        ContentPart::Text { text } if !text.trim().is_empty() => {
                            pieces.push(text.clone())
                        }
                        ContentPart::ToolCall(call) => pieces.push(render_call(call)),
                        ContentPart::ToolResult(result) => pieces.push(render_result(result)),
                        ContentPart::Text { .. } => {}
                    }
                }
                let role = match msg.role {
                    Role::Tool => Role::User,
                    role => role,
                };
                json!({ "role": role.to_string(), "content": pieces.join("\n") })
            })
            .collect()
    }

    fn tool_choice(&self, _choice: &ToolChoice) -> Option<Value> {
        None
    }

    fn system_prompt(&self, base: Option<&str>, tools: &ProviderToolList) -> Option<String> {
        let Some(section) = tools.prose() else {
            return base.map(str::to_string);
        };
        debug!(tools = tools.capability_count(), "appending tool descriptions to system prompt");
        Some(match base.map(str::trim).filter(|b| !b.is_empty()) {
            Some(base) => format!("{base}\n\n{section}"),
            None => section.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::translate;
    use pretty_assertions::assert_eq;

    fn lookup() -> PreparedCapability {
        PreparedCapability::new(
            "genes_lookup",
            "Find genes linked to a condition",
            translate(&json!({
                "type": "object",
                "properties": {
                    "condition": { "type": "string", "description": "Condition name" },
                    "organism": { "type": "string", "enum": ["human", "mouse"] }
                },
                "required": ["condition"]
            })),
        )
    }

    #[test]
    fn describes_tools_as_prose() {
        let list = TextFallbackAdapter.convert_capabilities(&[lookup()]);
        let text = list.prose().unwrap();
        assert!(text.contains("### genes_lookup"));
        assert!(text.contains("- `condition` (string) (required): Condition name"));
        assert!(text.contains("- `organism` (string): one of human, mouse."));
        assert_eq!(list.capability_count(), 1);

        let prompt = TextFallbackAdapter
            .system_prompt(Some("You are helpful."), &list)
            .unwrap();
        assert!(prompt.starts_with("You are helpful.\n\n## Available Tools"));
    }

    #[test]
    fn parses_fenced_blocks_and_strips_them() {
        let raw = json!({ "message": { "content":
            "Let me look.\n```tool\n{\"tool\": \"genes_lookup\", \"arguments\": {\"condition\": \"X\"}}\n```\nOne moment."
        } });
        let calls = TextFallbackAdapter.extract_calls(&raw);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].normalized_name, "genes_lookup");
        assert_eq!(calls[0].input, json!({ "condition": "X" }));
        assert_eq!(TextFallbackAdapter.extract_text(&raw), "Let me look.\nOne moment.");
    }

    #[test]
    fn parses_tool_call_tags() {
        let raw = json!("<tool_call>{\"name\": \"a\", \"input\": {\"k\": 1}}</tool_call>\n<tool_call>{\"name\": \"b\"}</tool_call>");
        let calls = TextFallbackAdapter.extract_calls(&raw);
        let names: Vec<_> = calls.iter().map(|c| c.normalized_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(calls[0].input, json!({ "k": 1 }));
        assert_eq!(TextFallbackAdapter.extract_text(&raw), "");
    }

    #[test]
    fn parses_bare_json_with_tool_key() {
        let raw = json!({ "response": "Sure: {\"tool\": \"genes_lookup\", \"parameters\": \"{bad\"}" });
        let calls = TextFallbackAdapter.extract_calls(&raw);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input, json!({}));
        assert_eq!(TextFallbackAdapter.extract_text(&raw), "Sure:");
    }

    #[test]
    fn plain_json_answers_are_not_calls() {
        let raw = json!("The result is {\"name\": \"TP53\"}.");
        assert!(TextFallbackAdapter.extract_calls(&raw).is_empty());
        assert_eq!(TextFallbackAdapter.extract_text(&raw), "The result is {\"name\": \"TP53\"}.");
    }

    #[test]
    fn malformed_blocks_yield_no_calls() {
        let raw = json!("```tool\n{oops\n```");
        assert!(TextFallbackAdapter.extract_calls(&raw).is_empty());
        assert!(TextFallbackAdapter.extract_calls(&json!(17)).is_empty());
    }

    #[test]
    fn results_are_user_text() {
        let msg = TextFallbackAdapter.format_results(&[
            CanonicalToolResult::success("c1", "genes_lookup", "BRCA1, TP53"),
            CanonicalToolResult::failure("c2", "other", "timeout"),
        ]);
        assert_eq!(msg.role, Role::User);
        assert_eq!(
            msg.text(),
            "[Tool 'genes_lookup' returned]\nBRCA1, TP53\n\n[Tool 'other' failed]\ntimeout"
        );
    }

    #[test]
    fn invocations_render_back_as_tool_blocks() {
        let call = CanonicalToolCall::new("c1", "genes_lookup", json!({ "condition": "X" }));
        let wire =
            TextFallbackAdapter.render_messages(&[Message::invocation("Checking.", &[call])]);
        assert_eq!(wire[0]["role"], "assistant");
        let content = wire[0]["content"].as_str().unwrap();
        assert!(content.starts_with("Checking.\n```tool\n"));
        assert_eq!(TextFallbackAdapter.extract_calls(&json!(content)).len(), 1);
        assert_eq!(TextFallbackAdapter.tool_choice(&ToolChoice::Required), None);
    }
}
