//! In-process capability host backed by closures.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::debug;

use super::{CapabilityDescriptor, CapabilityHost, QualifiedName, ToolOutput};
use crate::error::{Result, TesseraError};

type CapabilityHandler =
    dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<ToolOutput>> + Send + Sync;

/// Closure-based capability for quick registration.
pub struct FnCapability {
    name: String,
    description: String,
    parameters: serde_json::Value,
    handler: Arc<CapabilityHandler>,
}

impl FnCapability {
    /// Create a capability from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |input| Box::pin(handler(input))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for FnCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCapability")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Capability host holding closures grouped by source.
///
/// Sources and capabilities are listed in name order.
#[derive(Debug, Default)]
pub struct StaticCapabilityHost {
    sources: BTreeMap<String, BTreeMap<String, FnCapability>>,
}

impl StaticCapabilityHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under `source`, replacing any same-named one.
    pub fn register(&mut self, source: impl Into<String>, capability: FnCapability) {
        self.sources
            .entry(source.into())
            .or_default()
            .insert(capability.name.clone(), capability);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, source: impl Into<String>, capability: FnCapability) -> Self {
        self.register(source, capability);
        self
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

#[async_trait]
impl CapabilityHost for StaticCapabilityHost {
    async fn list_capabilities(
        &self,
        excluded_sources: &[String],
    ) -> Result<Vec<CapabilityDescriptor>> {
        let listed = self
            .sources
            .iter()
            .filter(|(source, _)| !excluded_sources.iter().any(|ex| ex == *source))
            .flat_map(|(source, capabilities)| {
                capabilities.values().map(move |cap| CapabilityDescriptor {
                    name: QualifiedName::new(source.clone(), cap.name.clone()),
                    description: cap.description.clone(),
                    parameter_schema: cap.parameters.clone(),
                })
            })
            .collect::<Vec<_>>();
        debug!(count = listed.len(), excluded = excluded_sources.len(), "listed capabilities");
        Ok(listed)
    }

    async fn call_tool(
        &self,
        source: &str,
        capability: &str,
        input: serde_json::Value,
    ) -> Result<ToolOutput> {
        let cap = self
            .sources
            .get(source)
            .and_then(|caps| caps.get(capability))
            .ok_or_else(|| {
                TesseraError::UnknownCapability(QualifiedName::new(source, capability).to_string())
            })?;
        (cap.handler)(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo(name: &str) -> FnCapability {
        FnCapability::new(name, "echo input", json!({ "type": "object" }), |input| async move {
            Ok(ToolOutput::text(input.to_string()))
        })
    }

    #[tokio::test]
    async fn excluded_sources_are_not_listed() {
        let host = StaticCapabilityHost::new()
            .with("pubmed", echo("search"))
            .with("pubtator", echo("annotate"));

        let listed = host
            .list_capabilities(&["pubmed".to_string()])
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, QualifiedName::new("pubtator", "annotate"));
    }

    #[tokio::test]
    async fn call_tool_routes_to_handler() {
        let host = StaticCapabilityHost::new().with("pubmed", echo("search"));
        let output = host
            .call_tool("pubmed", "search", json!({ "q": "tp53" }))
            .await
            .unwrap();
        assert_eq!(output.content, json!(r#"{"q":"tp53"}"#));
    }

    #[tokio::test]
    async fn unknown_capability_is_an_error() {
        let host = StaticCapabilityHost::new();
        let err = host.call_tool("nope", "missing", json!({})).await.unwrap_err();
        assert!(matches!(err, TesseraError::UnknownCapability(name) if name == "nope/missing"));
    }
}
