//! Knowledge-graph fragments and their order-independent merge.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

fn default_weight() -> u32 {
    1
}

/// A graph node. `id` is unique within a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    /// Connection count; summed when the same node arrives more than once.
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub evidence: BTreeSet<String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            weight: default_weight(),
            evidence: BTreeSet::new(),
        }
    }

    pub fn with_evidence<I, S>(mut self, evidence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence.extend(evidence.into_iter().map(Into::into));
        self
    }

    fn absorb(&mut self, other: GraphNode) {
        self.name = prefer(std::mem::take(&mut self.name), other.name);
        self.kind = prefer(std::mem::take(&mut self.kind), other.kind);
        self.weight = self.weight.saturating_add(other.weight);
        self.evidence.extend(other.evidence);
    }
}

/// A labelled link. Identity is the unordered endpoint pair plus the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub evidence: BTreeSet<String>,
}

impl GraphLink {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
            weight: default_weight(),
            evidence: BTreeSet::new(),
        }
    }

    pub fn with_evidence<I, S>(mut self, evidence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence.extend(evidence.into_iter().map(Into::into));
        self
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(&self.source, &self.target, &self.label)
    }
}

/// Unordered `(a, b, label)` link identity with `a <= b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub a: String,
    pub b: String,
    pub label: String,
}

impl LinkKey {
    pub fn new(source: &str, target: &str, label: &str) -> Self {
        let (a, b) = if source <= target {
            (source, target)
        } else {
            (target, source)
        };
        Self {
            a: a.to_string(),
            b: b.to_string(),
            label: label.to_string(),
        }
    }
}

/// Nodes and links produced by a single capability result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFragment {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

impl GraphFragment {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }
}

/// Accumulated graph. Merge is commutative and associative: the final graph
/// does not depend on fragment arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeGraph {
    nodes: BTreeMap<String, GraphNode>,
    links: BTreeMap<LinkKey, GraphLink>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fragment(fragment: GraphFragment) -> Self {
        let mut graph = Self::new();
        graph.merge_fragment(fragment);
        graph
    }

    /// Fold one fragment into the graph.
    pub fn merge_fragment(&mut self, fragment: GraphFragment) {
        for node in fragment.nodes {
            self.insert_node(node);
        }
        for link in fragment.links {
            self.insert_link(link);
        }
    }

    /// Fold another accumulated graph into this one.
    pub fn merge(&mut self, other: KnowledgeGraph) {
        for (_, node) in other.nodes {
            self.insert_node(node);
        }
        for (_, link) in other.links {
            self.insert_link(link);
        }
    }

    fn insert_node(&mut self, node: GraphNode) {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => existing.absorb(node),
            None => {
                self.nodes.insert(node.id.clone(), node);
            }
        }
    }

    fn insert_link(&mut self, mut link: GraphLink) {
        let key = link.key();
        match self.links.get_mut(&key) {
            Some(existing) => {
                existing.weight = existing.weight.saturating_add(link.weight);
                existing.evidence.extend(link.evidence);
            }
            None => {
                link.source = key.a.clone();
                link.target = key.b.clone();
                self.links.insert(key, link);
            }
        }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn link(&self, source: &str, target: &str, label: &str) -> Option<&GraphLink> {
        self.links.get(&LinkKey::new(source, target, label))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &GraphLink> {
        self.links.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    /// Flatten into fragment form, ordered by node id and link key.
    pub fn to_fragment(&self) -> GraphFragment {
        GraphFragment {
            nodes: self.nodes.values().cloned().collect(),
            links: self.links.values().cloned().collect(),
        }
    }
}

impl Serialize for KnowledgeGraph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_fragment().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KnowledgeGraph {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        GraphFragment::deserialize(deserializer).map(Self::from_fragment)
    }
}

/// Smallest non-empty value wins; empty is the identity.
fn prefer(current: String, incoming: String) -> String {
    match (current.is_empty(), incoming.is_empty()) {
        (true, _) => incoming,
        (_, true) => current,
        _ => std::cmp::min(current, incoming),
    }
}
