//! SearchIndex: flat text blobs for every node and edge in a snapshot.
//!
//! Design:
//! - One [`IndexEntry`] per node and per edge, keyed by `"{kind}-{id}"`.
//! - Entries keep snapshot order; a duplicate key replaces the earlier entry
//!   in place rather than appending.
//! - The blob is label, type, id, then every property key and value, joined
//!   with spaces. No stemming and no tokenizer: matching is substring or
//!   subsequence based (see `search`).
//!
//! The index is only valid for the snapshot it was built from. Rebuilding is
//! total; there is no incremental update path.

use ahash::AHashMap;
use serde::Serialize;

use crate::model::{stringify, Edge, Entity, EntityId, EntityKind, Node};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Lowercased searchable text.
    pub text: String,
    /// Searchable text in its original case (used by case-sensitive search).
    pub original: String,
    pub entity: Entity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Default, Clone)]
pub struct SearchIndex {
    entries: Vec<IndexEntry>,
    by_key: AHashMap<String, usize>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(nodes: &[Node], edges: &[Edge]) -> Self {
        let mut index = Self::new();
        index.build(nodes, edges);
        index
    }

    /// Clear prior state and index every node and edge.
    pub fn build(&mut self, nodes: &[Node], edges: &[Edge]) {
        self.clear();
        self.entries.reserve(nodes.len() + edges.len());
        for node in nodes {
            self.insert(Entity::Node(node.clone()));
        }
        for edge in edges {
            self.insert(Entity::Edge(edge.clone()));
        }
        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            entries = self.entries.len(),
            "search index rebuilt"
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_key.clear();
    }

    fn insert(&mut self, entity: Entity) {
        let original = extract_searchable_text(&entity);
        let entry = IndexEntry {
            id: entity.id().clone(),
            kind: entity.kind(),
            text: original.to_lowercase(),
            original,
            entity,
        };
        let key = index_key(entry.kind, &entry.id);
        match self.by_key.get(&key) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.by_key.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Option<&IndexEntry> {
        let pos = self.by_key.get(&index_key(kind, id))?;
        self.entries.get(*pos)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whitespace-split words of every entry's lowercased text, in index order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().flat_map(|e| e.text.split_whitespace())
    }

    pub fn stats(&self) -> IndexStats {
        let nodes = self
            .entries
            .iter()
            .filter(|e| e.kind == EntityKind::Node)
            .count();
        IndexStats {
            nodes,
            edges: self.entries.len() - nodes,
        }
    }
}

pub fn index_key(kind: EntityKind, id: &EntityId) -> String {
    format!("{kind}-{id}")
}

/// Label, type, stringified id, then each property key and value, space-joined.
///
/// The result keeps its original case; the index stores a lowercased copy.
pub fn extract_searchable_text(entity: &Entity) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3 + entity.properties().len() * 2);
    if let Some(label) = entity.label() {
        parts.push(label.to_string());
    }
    if let Some(ty) = entity.entity_type() {
        parts.push(ty.to_string());
    }
    parts.push(entity.id().to_string());
    for (key, value) in entity.properties() {
        parts.push(key.clone());
        parts.push(stringify(value));
    }
    parts.join(" ")
}
