//! Externally declared capabilities and the interfaces that list and execute them.

pub mod host;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::artifacts::SidePayloads;
use crate::error::{Result, TesseraError};

pub use host::{FnCapability, StaticCapabilityHost};

/// A capability's identity: the source that hosts it plus its own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub source: String,
    pub capability: String,
}

impl QualifiedName {
    pub fn new(source: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            capability: capability.into(),
        }
    }

    /// Parse the `source/capability` form used in configuration.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().split_once('/') {
            Some((source, capability)) if !source.is_empty() && !capability.is_empty() => {
                Ok(Self::new(source, capability))
            }
            _ => Err(TesseraError::InvalidArgument(format!(
                "expected 'source/capability', got '{value}'"
            ))),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.capability)
    }
}

/// A capability as advertised by its source. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: QualifiedName,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameter_schema: serde_json::Value,
}

impl CapabilityDescriptor {
    pub fn new(
        source: impl Into<String>,
        capability: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: QualifiedName::new(source, capability),
            description: description.into(),
            parameter_schema,
        }
    }
}

/// Output of a capability invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Primary content: a string, a list of `{type: "text", text}` blocks, or any JSON.
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_payloads: Option<SidePayloads>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: serde_json::Value::String(text.into()),
            side_payloads: None,
        }
    }

    pub fn with_side_payloads(mut self, payloads: SidePayloads) -> Self {
        self.side_payloads = Some(payloads);
        self
    }

    /// Primary content flattened to text; text blocks are joined by newlines.
    pub fn content_text(&self) -> String {
        crate::adapter::format::value_to_text(&self.content)
    }

    /// Build an output from a raw tool JSON document, lifting any side payload keys.
    pub fn from_value(value: serde_json::Value) -> Self {
        let side_payloads = SidePayloads::from_value(&value);
        let content = match value {
            serde_json::Value::Object(mut obj) if obj.contains_key("content") => {
                obj.remove("content").unwrap_or_default()
            }
            other => other,
        };
        Self {
            content,
            side_payloads,
        }
    }
}

/// Lists capabilities and executes them. No retry happens at this layer.
#[async_trait]
pub trait CapabilityHost: Send + Sync {
    /// Capabilities from every source not named in `excluded_sources`.
    async fn list_capabilities(
        &self,
        excluded_sources: &[String],
    ) -> Result<Vec<CapabilityDescriptor>>;

    /// Execute `capability` on `source` with structured input.
    async fn call_tool(
        &self,
        source: &str,
        capability: &str,
        input: serde_json::Value,
    ) -> Result<ToolOutput>;
}
