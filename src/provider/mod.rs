//! Provider query interface and per-run provider selection.

pub mod registry;

use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use registry::{ProviderEntry, ProviderRegistry};

/// Sampling and tool options for one query.
#[derive(Debug, Clone, Default, PartialEq, Builder, Serialize, Deserialize)]
pub struct QueryOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Native tool definitions, already shaped by the run's adapter.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<serde_json::Value>,
    pub tool_choice: Option<serde_json::Value>,
}

/// A request sent to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderQuery {
    /// Wire messages rendered by the run's adapter.
    pub messages: Vec<serde_json::Value>,
    pub system_prompt: Option<String>,
    pub options: QueryOptions,
}

/// A language-model backend.
///
/// Responses are opaque: only the adapter selected for the provider inspects
/// their structure.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn query(&self, query: &ProviderQuery) -> Result<serde_json::Value>;
}
