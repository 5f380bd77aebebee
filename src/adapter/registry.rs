//! Adapter selection keyed by provider id.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AdapterFamily, ProviderAdapter};

/// Maps provider ids to adapters.
///
/// Explicit registrations win; any other id falls back to
/// [`AdapterFamily::for_provider`].
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    overrides: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `adapter` for `provider_id`.
    pub fn register(&mut self, provider_id: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        self.overrides.insert(normalize_id(&provider_id.into()), adapter);
    }

    /// Use the stock adapter of `family` for `provider_id`.
    pub fn register_family(&mut self, provider_id: impl Into<String>, family: AdapterFamily) {
        self.register(provider_id, family.adapter());
    }

    /// Adapter for `provider_id`. Never fails.
    pub fn adapter_for(&self, provider_id: &str) -> Arc<dyn ProviderAdapter> {
        let key = normalize_id(provider_id);
        self.overrides
            .get(&key)
            .cloned()
            .unwrap_or_else(|| AdapterFamily::for_provider(&key).adapter())
    }

    pub fn family_for(&self, provider_id: &str) -> AdapterFamily {
        self.adapter_for(provider_id).family()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut overrides: Vec<_> = self
            .overrides
            .iter()
            .map(|(id, adapter)| (id.as_str(), adapter.family()))
            .collect();
        overrides.sort();
        f.debug_struct("AdapterRegistry")
            .field("overrides", &overrides)
            .finish()
    }
}

fn normalize_id(provider_id: &str) -> String {
    provider_id.trim().to_ascii_lowercase()
}
