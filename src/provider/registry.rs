//! Provider registry for per-run provider resolution.

use std::collections::HashMap;
use std::sync::Arc;

use super::ProviderClient;
use crate::adapter::{AdapterFamily, AdapterRegistry, ProviderAdapter};
use crate::error::{Result, TesseraError};

/// A client paired with the adapter that understands its wire format.
#[derive(Clone)]
pub struct ProviderEntry {
    pub client: Arc<dyn ProviderClient>,
    pub adapter: Arc<dyn ProviderAdapter>,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("client", &self.client.provider_name())
            .field("family", &self.adapter.family())
            .finish()
    }
}

/// Registry mapping provider ids to clients and adapters.
///
/// Resolved once at the start of a run; there is no per-message branching on
/// provider identity after that.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderEntry>,
    adapters: AdapterRegistry,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose default adapter choice comes from `adapters`.
    pub fn with_adapters(adapters: AdapterRegistry) -> Self {
        Self {
            entries: HashMap::new(),
            adapters,
        }
    }

    /// Register `client` under `provider_id` with the adapter chosen by id.
    pub fn register(&mut self, provider_id: impl Into<String>, client: Arc<dyn ProviderClient>) {
        let provider_id = provider_id.into();
        let adapter = self.adapters.adapter_for(&provider_id);
        self.register_with_adapter(provider_id, client, adapter);
    }

    /// Register `client` with an explicit adapter family.
    pub fn register_with_family(
        &mut self,
        provider_id: impl Into<String>,
        client: Arc<dyn ProviderClient>,
        family: AdapterFamily,
    ) {
        self.register_with_adapter(provider_id, client, family.adapter());
    }

    pub fn register_with_adapter(
        &mut self,
        provider_id: impl Into<String>,
        client: Arc<dyn ProviderClient>,
        adapter: Arc<dyn ProviderAdapter>,
    ) {
        self.entries
            .insert(key(&provider_id.into()), ProviderEntry { client, adapter });
    }

    /// Entry for `provider_id`.
    pub fn resolve(&self, provider_id: &str) -> Result<ProviderEntry> {
        self.entries
            .get(&key(provider_id))
            .cloned()
            .ok_or_else(|| TesseraError::UnknownProvider(provider_id.to_string()))
    }

    pub fn has_provider(&self, provider_id: &str) -> bool {
        self.entries.contains_key(&key(provider_id))
    }

    /// Registered provider ids, sorted.
    pub fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

fn key(provider_id: &str) -> String {
    provider_id.trim().to_ascii_lowercase()
}
