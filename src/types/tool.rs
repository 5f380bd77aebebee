//! Canonical tool call and result forms.

use serde::{Deserialize, Serialize};

use crate::artifacts::SidePayloads;

/// A tool call extracted from a provider response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalToolCall {
    pub correlation_id: String,
    pub normalized_name: String,
    pub input: serde_json::Value,
}

impl CanonicalToolCall {
    pub fn new(
        correlation_id: impl Into<String>,
        normalized_name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            normalized_name: normalized_name.into(),
            input,
        }
    }
}

/// The outcome of executing one [`CanonicalToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalToolResult {
    pub correlation_id: String,
    pub normalized_name: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_payloads: Option<SidePayloads>,
}

impl CanonicalToolResult {
    pub fn success(
        correlation_id: impl Into<String>,
        normalized_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            normalized_name: normalized_name.into(),
            content: content.into(),
            is_error: false,
            side_payloads: None,
        }
    }

    pub fn failure(
        correlation_id: impl Into<String>,
        normalized_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            is_error: true,
            ..Self::success(correlation_id, normalized_name, message)
        }
    }

    pub fn with_side_payloads(mut self, payloads: Option<SidePayloads>) -> Self {
        self.side_payloads = payloads;
        self
    }
}
