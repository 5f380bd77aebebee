//! Reference entries and first-wins deduplication.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A bibliographic or source reference returned by a capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Source-specific fields (`doi`, `pmid`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ReferenceEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: title.into(),
            ..Self::default()
        }
    }
}

// Sources disagree on whether ids and years are strings or integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Derives the deduplication identifier for an entry. `None` means the
/// entry cannot be deduplicated and is always kept.
pub type ReferenceKeyFn = Arc<dyn Fn(&ReferenceEntry) -> Option<String> + Send + Sync>;

/// Default identity: `id`, then `doi`/`pmid`, then `url`, then title.
pub fn default_reference_key(entry: &ReferenceEntry) -> Option<String> {
    let non_empty = |value: &str| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    if let Some(id) = entry.id.as_deref().and_then(non_empty) {
        return Some(id);
    }
    for field in ["doi", "pmid"] {
        let found = match entry.extra.get(field) {
            Some(serde_json::Value::String(s)) => non_empty(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if let Some(found) = found {
            return Some(format!("{field}:{found}"));
        }
    }
    entry
        .url
        .as_deref()
        .and_then(non_empty)
        .or_else(|| non_empty(&entry.title).map(|t| t.to_lowercase()))
}

/// Ordered reference list that keeps the first entry seen for each identifier.
#[derive(Clone)]
pub struct ReferenceList {
    entries: Vec<ReferenceEntry>,
    seen: HashSet<String>,
    key: ReferenceKeyFn,
}

impl Default for ReferenceList {
    fn default() -> Self {
        Self::with_key(Arc::new(default_reference_key))
    }
}

impl std::fmt::Debug for ReferenceList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceList")
            .field("entries", &self.entries)
            .finish()
    }
}

impl ReferenceList {
    pub fn with_key(key: ReferenceKeyFn) -> Self {
        Self {
            entries: Vec::new(),
            seen: HashSet::new(),
            key,
        }
    }

    /// Add an entry; returns `false` when an entry with the same identifier exists.
    pub fn push(&mut self, entry: ReferenceEntry) -> bool {
        if let Some(id) = (self.key)(&entry) {
            if !self.seen.insert(id) {
                return false;
            }
        }
        self.entries.push(entry);
        true
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ReferenceEntry>) -> usize {
        entries.into_iter().filter(|e| self.push(e.clone())).count()
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ReferenceEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_occurrence_wins() {
        let mut list = ReferenceList::default();
        assert!(list.push(ReferenceEntry::new("R1", "Original title")));
        assert!(!list.push(ReferenceEntry::new("R1", "Later title")));
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries()[0].title, "Original title");
    }

    #[test]
    fn falls_back_to_doi_then_url_then_title() {
        let with_doi: ReferenceEntry =
            serde_json::from_value(json!({ "title": "A", "doi": "10.1/x" })).unwrap();
        assert_eq!(default_reference_key(&with_doi).as_deref(), Some("doi:10.1/x"));

        let with_pmid: ReferenceEntry =
            serde_json::from_value(json!({ "title": "A", "pmid": 12345 })).unwrap();
        assert_eq!(default_reference_key(&with_pmid).as_deref(), Some("pmid:12345"));

        let with_url = ReferenceEntry {
            url: Some("https://example.org/a".into()),
            title: "A".into(),
            ..Default::default()
        };
        assert_eq!(
            default_reference_key(&with_url).as_deref(),
            Some("https://example.org/a")
        );

        let title_only = ReferenceEntry {
            title: "Some Title".into(),
            ..Default::default()
        };
        assert_eq!(default_reference_key(&title_only).as_deref(), Some("some title"));
    }

    #[test]
    fn numeric_years_are_accepted() {
        let entry: ReferenceEntry =
            serde_json::from_value(json!({ "id": "R1", "title": "T", "year": 2021 })).unwrap();
        assert_eq!(entry.year.as_deref(), Some("2021"));
    }

    #[test]
    fn keyless_entries_are_all_kept() {
        let mut list = ReferenceList::default();
        list.push(ReferenceEntry::default());
        list.push(ReferenceEntry::default());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn custom_key_is_honored() {
        let mut list = ReferenceList::with_key(Arc::new(|e: &ReferenceEntry| e.year.clone()));
        let mut a = ReferenceEntry::new("A", "a");
        a.year = Some("2020".into());
        let mut b = ReferenceEntry::new("B", "b");
        b.year = Some("2020".into());
        assert_eq!(list.extend([a, b]), 1);
    }
}
