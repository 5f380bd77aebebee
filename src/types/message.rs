//! Canonical transcript types shared by every adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::tool::{CanonicalToolCall, CanonicalToolResult};

/// A message in a run's working conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    fn with_parts(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            role,
            content,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_parts(Role::System, vec![ContentPart::text(text)])
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_parts(Role::User, vec![ContentPart::text(text)])
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_parts(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// Assistant message recording tool invocations, with optional leading text.
    pub fn invocation(text: &str, calls: &[CanonicalToolCall]) -> Self {
        let mut content = Vec::with_capacity(calls.len() + 1);
        if !text.trim().is_empty() {
            content.push(ContentPart::text(text));
        }
        content.extend(calls.iter().cloned().map(ContentPart::ToolCall));
        Self::with_parts(Role::Assistant, content)
    }

    /// Correlated tool-result message for families with a native result channel.
    pub fn tool_results(results: &[CanonicalToolResult]) -> Self {
        let content = results
            .iter()
            .map(|result| {
                let mut result = result.clone();
                result.side_payloads = None;
                ContentPart::ToolResult(result)
            })
            .collect();
        Self::with_parts(Role::Tool, content)
    }

    /// Concatenate all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool calls recorded in this message.
    pub fn tool_calls(&self) -> Vec<&CanonicalToolCall> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// Tool results recorded in this message.
    pub fn tool_result_parts(&self) -> Vec<&CanonicalToolResult> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult(result) => Some(result),
                _ => None,
            })
            .collect()
    }
}

/// Conversation role.
///
/// `Tool` marks correlated result messages; adapters decide how it appears on
/// the wire (a `tool` role, a user turn with result blocks, and so on).
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single part of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ToolCall(CanonicalToolCall),
    ToolResult(CanonicalToolResult),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}
