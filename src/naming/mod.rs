//! Capability name normalization with reverse lookup.
//!
//! Provider tool channels accept at most 64 characters from `[A-Za-z0-9_]`.
//! Names are composed as `source_capability`; when that overflows, the source
//! is cut to a bounded prefix first and the capability fills what is left.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::capability::QualifiedName;
use crate::error::{Result, TesseraError};

/// Maximum identifier length accepted by provider tool channels.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// Source characters kept when a composed name must be truncated.
pub const SOURCE_PREFIX_BUDGET: usize = 20;

fn disallowed_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern"))
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize(raw: &str) -> String {
    disallowed_chars().replace_all(raw, "_").into_owned()
}

fn truncate(value: &str, max: usize) -> String {
    // sanitized input is ASCII, so byte and char boundaries agree
    value.chars().take(max).collect()
}

/// Compose the provider-facing name for `(source, capability)`.
///
/// Pure: the same pair and limits always give the same output.
pub fn compose_name(
    source: &str,
    capability: &str,
    max_len: usize,
    source_budget: usize,
) -> String {
    let composed = sanitize(&format!("{source}_{capability}"));
    if composed.len() <= max_len {
        return ensure_non_empty(composed);
    }

    let source_part = sanitize(&truncate(&sanitize(source), source_budget));
    let remaining = max_len.saturating_sub(source_part.len() + 1);
    let capability_part = sanitize(&truncate(&sanitize(capability), remaining));
    ensure_non_empty(truncate(
        &sanitize(&format!("{source_part}_{capability_part}")),
        max_len,
    ))
}

fn ensure_non_empty(name: String) -> String {
    if name.is_empty() {
        "_".to_string()
    } else {
        name
    }
}

/// Per-run table from normalized names back to qualified names.
#[derive(Debug, Clone)]
pub struct CapabilityNameRegistry {
    max_len: usize,
    source_budget: usize,
    forward: HashMap<QualifiedName, String>,
    reverse: HashMap<String, QualifiedName>,
}

impl Default for CapabilityNameRegistry {
    fn default() -> Self {
        Self {
            max_len: MAX_TOOL_NAME_LEN,
            source_budget: SOURCE_PREFIX_BUDGET,
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }
}

impl CapabilityNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with custom limits. The source budget must leave room for a
    /// separator and at least one capability character.
    pub fn with_limits(max_len: usize, source_budget: usize) -> Result<Self> {
        if source_budget == 0 || source_budget + 2 > max_len {
            return Err(TesseraError::Configuration(format!(
                "source prefix budget {source_budget} does not fit tool name limit {max_len}"
            )));
        }
        Ok(Self {
            max_len,
            source_budget,
            ..Self::default()
        })
    }

    /// Normalize and register `name`.
    ///
    /// Idempotent for the same pair. A different pair that lands on an
    /// already-registered name is rejected rather than overwriting the route.
    pub fn normalize(&mut self, name: &QualifiedName) -> Result<String> {
        if let Some(existing) = self.forward.get(name) {
            return Ok(existing.clone());
        }

        let normalized = compose_name(
            &name.source,
            &name.capability,
            self.max_len,
            self.source_budget,
        );
        if let Some(existing) = self.reverse.get(&normalized) {
            return Err(TesseraError::NameCollision {
                name: normalized,
                existing: existing.clone(),
                incoming: name.clone(),
            });
        }

        debug!(qualified = %name, normalized = %normalized, "registered capability name");
        self.reverse.insert(normalized.clone(), name.clone());
        self.forward.insert(name.clone(), normalized.clone());
        Ok(normalized)
    }

    /// Map a normalized name back to its qualified name.
    pub fn resolve(&self, normalized: &str) -> Result<&QualifiedName> {
        self.reverse
            .get(normalized)
            .ok_or_else(|| TesseraError::UnknownCapability(normalized.to_string()))
    }

    /// Normalized name previously assigned to `name`, if any.
    pub fn normalized_for(&self, name: &QualifiedName) -> Option<&str> {
        self.forward.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}
