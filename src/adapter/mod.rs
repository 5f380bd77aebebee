//! Provider adapters: one tool-calling dialect per backend family.
//!
//! An adapter owns every structural decision about a provider's wire format.
//! The orchestration loop only ever sees canonical calls, results and messages.

pub mod format;
pub mod function_call;
pub mod function_declaration;
pub mod registry;
pub mod text_fallback;
pub mod tool_use;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::schema::{normalize_schema_for_family, InputDescriptor};
use crate::types::{CanonicalToolCall, CanonicalToolResult, Message};

pub use function_call::FunctionCallAdapter;
pub use function_declaration::FunctionDeclarationAdapter;
pub use registry::AdapterRegistry;
pub use text_fallback::TextFallbackAdapter;
pub use tool_use::ToolUseAdapter;

/// Backend family, keyed by how tool calls travel on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AdapterFamily {
    /// Calls arrive as a structured array on the primary choice.
    FunctionCall,
    /// Calls are typed content blocks inside the response.
    ToolUse,
    /// Calls are `functionCall` parts of the first candidate.
    FunctionDeclaration,
    /// No native tool channel; tools and results travel as prompt text.
    TextFallback,
}

impl AdapterFamily {
    /// Family used for a provider id with no explicit registration.
    pub fn for_provider(provider_id: &str) -> Self {
        match provider_id.trim().to_ascii_lowercase().as_str() {
            "openai" | "azure" | "groq" | "mistral" | "openrouter" | "together" => {
                Self::FunctionCall
            }
            "anthropic" => Self::ToolUse,
            "google" | "gemini" => Self::FunctionDeclaration,
            _ => Self::TextFallback,
        }
    }

    /// Stateless adapter instance for this family.
    pub fn adapter(self) -> Arc<dyn ProviderAdapter> {
        match self {
            Self::FunctionCall => Arc::new(FunctionCallAdapter),
            Self::ToolUse => Arc::new(ToolUseAdapter),
            Self::FunctionDeclaration => Arc::new(FunctionDeclarationAdapter),
            Self::TextFallback => Arc::new(TextFallbackAdapter),
        }
    }
}

/// Tool choice requested for a provider query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
    /// Force one tool, by normalized name.
    Function(String),
}

/// A capability after translation and name normalization, ready for an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCapability {
    pub normalized_name: String,
    pub description: String,
    pub input: InputDescriptor,
}

impl PreparedCapability {
    pub fn new(
        normalized_name: impl Into<String>,
        description: impl Into<String>,
        input: InputDescriptor,
    ) -> Self {
        Self {
            normalized_name: normalized_name.into(),
            description: description.into(),
            input,
        }
    }

    /// JSON schema for the parameters, shaped for `family`.
    pub fn parameters_for(&self, family: AdapterFamily) -> serde_json::Value {
        normalize_schema_for_family(&self.input.to_json_schema(), family)
    }
}

/// Provider-facing tool list produced by [`ProviderAdapter::convert_capabilities`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderToolList {
    /// Tool definitions sent through the provider's native tool channel.
    Native {
        tools: Vec<serde_json::Value>,
        capability_count: usize,
    },
    /// Tool descriptions rendered as prompt text.
    Prose {
        text: String,
        capability_count: usize,
    },
}

impl ProviderToolList {
    /// Number of capabilities represented, independent of wire wrapping.
    pub fn capability_count(&self) -> usize {
        match self {
            Self::Native {
                capability_count, ..
            }
            | Self::Prose {
                capability_count, ..
            } => *capability_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.capability_count() == 0
    }

    /// Tools for the native channel; empty for prose lists.
    pub fn native_tools(&self) -> &[serde_json::Value] {
        match self {
            Self::Native { tools, .. } => tools,
            Self::Prose { .. } => &[],
        }
    }

    pub fn prose(&self) -> Option<&str> {
        match self {
            Self::Prose { text, .. } if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Translates between the canonical forms and one family's wire format.
///
/// No method returns an error: unrecognized upstream shapes degrade to empty
/// output and are logged.
pub trait ProviderAdapter: Send + Sync {
    fn family(&self) -> AdapterFamily;

    /// Convert every prepared capability; none may be dropped.
    fn convert_capabilities(&self, capabilities: &[PreparedCapability]) -> ProviderToolList;

    /// Tool calls found in a raw provider response, or an empty list.
    fn extract_calls(&self, raw: &serde_json::Value) -> Vec<CanonicalToolCall>;

    /// Narrative text of a raw provider response, or an empty string.
    fn extract_text(&self, raw: &serde_json::Value) -> String;

    /// Assistant record of the calls being executed.
    fn format_invocation(&self, text: &str, calls: &[CanonicalToolCall]) -> Message {
        Message::invocation(text, calls)
    }

    /// Message carrying results back to the provider.
    fn format_results(&self, results: &[CanonicalToolResult]) -> Message;

    /// Render a canonical transcript as wire messages.
    fn render_messages(&self, messages: &[Message]) -> Vec<serde_json::Value>;

    /// Wire form of a tool choice; `None` means omit the field.
    fn tool_choice(&self, choice: &ToolChoice) -> Option<serde_json::Value>;

    /// System prompt for a query, given the converted tool list.
    fn system_prompt(&self, base: Option<&str>, _tools: &ProviderToolList) -> Option<String> {
        base.map(str::to_string)
    }
}
