//! Side-artifact accumulation across a run.
//!
//! Tool results may carry structured payloads next to their primary content.
//! The [`ArtifactAccumulator`] folds them into one [`AccumulatedArtifacts`]
//! value as results arrive.

pub mod graph;
pub mod references;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TesseraError};

pub use graph::{GraphFragment, GraphLink, GraphNode, KnowledgeGraph, LinkKey};
pub use references::{default_reference_key, ReferenceEntry, ReferenceKeyFn, ReferenceList};

/// Structured payloads attached to a tool result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidePayloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<ReferenceEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_outputs: Option<Vec<BinaryOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_text: Option<String>,
}

impl SidePayloads {
    pub fn is_empty(&self) -> bool {
        self.references.is_none()
            && self.graph.is_none()
            && self.binary_outputs.is_none()
            && self.document_text.is_none()
    }

    /// Lift side payload keys out of a raw tool JSON document.
    ///
    /// Each key is parsed independently; a malformed key is dropped and the
    /// rest are kept. Returns `None` when nothing usable is present.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let payloads = Self {
            references: lift_references(obj),
            graph: lift(obj, "graph"),
            binary_outputs: lift(obj, "binaryOutputs"),
            document_text: lift(obj, "documentText"),
        };
        (!payloads.is_empty()).then_some(payloads)
    }
}

fn lift<T: serde::de::DeserializeOwned>(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<T> {
    let raw = obj.get(key)?;
    if raw.is_null() {
        return None;
    }
    match serde_json::from_value(raw.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(key, error = %err, "ignoring malformed side payload");
            None
        }
    }
}

// References are parsed entry by entry so one bad entry does not drop its neighbours.
fn lift_references(
    obj: &serde_json::Map<String, serde_json::Value>,
) -> Option<Vec<ReferenceEntry>> {
    let raw = obj.get("references")?;
    let serde_json::Value::Array(items) = raw else {
        if !raw.is_null() {
            warn!(key = "references", "ignoring malformed side payload");
        }
        return None;
    };
    let entries = items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "ignoring malformed reference entry");
                None
            }
        })
        .collect();
    Some(entries)
}

/// A binary artifact such as a rendered figure, base64-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryOutput {
    pub mime_type: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl BinaryOutput {
    pub fn new(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            metadata: None,
        }
    }

    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| {
                TesseraError::InvalidArgument(format!(
                    "binary output ({}) is not valid base64: {e}",
                    self.mime_type
                ))
            })
    }
}

/// Everything collected from side payloads during one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedArtifacts {
    pub graph: KnowledgeGraph,
    pub references: Vec<ReferenceEntry>,
    pub binary_outputs: Vec<BinaryOutput>,
    /// Last document text seen; earlier values are overwritten.
    pub document_text: Option<String>,
    /// Number of graph fragments folded into `graph`.
    pub fragments_merged: usize,
}

impl AccumulatedArtifacts {
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
            && self.references.is_empty()
            && self.binary_outputs.is_empty()
            && self.document_text.is_none()
    }
}

/// Per-run accumulator. Owned by exactly one run.
#[derive(Debug, Default)]
pub struct ArtifactAccumulator {
    graph: KnowledgeGraph,
    references: ReferenceList,
    binary_outputs: Vec<BinaryOutput>,
    document_text: Option<String>,
    fragments_merged: usize,
}

impl ArtifactAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator deduplicating references with a caller-supplied identity.
    pub fn with_reference_key(key: ReferenceKeyFn) -> Self {
        Self {
            references: ReferenceList::with_key(key),
            ..Self::default()
        }
    }

    /// Fold one result's payloads in.
    pub fn absorb(&mut self, payloads: Option<SidePayloads>) {
        let Some(payloads) = payloads else {
            return;
        };

        if let Some(fragment) = payloads.graph {
            if !fragment.is_empty() {
                self.graph.merge_fragment(fragment);
                self.fragments_merged += 1;
            }
        }
        if let Some(entries) = payloads.references {
            let offered = entries.len();
            let added = self.references.extend(entries);
            if added < offered {
                debug!(offered, added, "deduplicated reference entries");
            }
        }
        if let Some(outputs) = payloads.binary_outputs {
            self.binary_outputs.extend(outputs);
        }
        if let Some(text) = payloads.document_text {
            self.document_text = Some(text);
        }
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn references(&self) -> &[ReferenceEntry] {
        self.references.entries()
    }

    pub fn finish(self) -> AccumulatedArtifacts {
        AccumulatedArtifacts {
            graph: self.graph,
            references: self.references.into_entries(),
            binary_outputs: self.binary_outputs,
            document_text: self.document_text,
            fragments_merged: self.fragments_merged,
        }
    }
}
