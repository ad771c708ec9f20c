//! Text search over a [`SearchIndex`].
//!
//! Two match modes:
//! - **fuzzy** (default): the query is a subsequence of the entry text
//! - **exact**: the query is a substring of the entry text
//!
//! Matches are ranked by [`relevance_score`], which rewards substring, prefix
//! and whole-word hits and penalizes long texts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_SEARCH_LIMIT;
use crate::index::{IndexEntry, SearchIndex};
use crate::model::{Entity, EntityKind};
use crate::operator::ValueMatch;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    pub case_sensitive: bool,
    /// Literal substring instead of fuzzy subsequence.
    pub exact_match: bool,
    pub search_nodes: bool,
    pub search_edges: bool,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            exact_match: false,
            search_nodes: true,
            search_edges: true,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchOptions {
    fn includes(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Node => self.search_nodes,
            EntityKind::Edge => self.search_edges,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub kind: EntityKind,
    pub entity: Entity,
    pub score: f64,
}

/// Whether every character of `query` occurs in `text` in order.
///
/// An empty query matches everything.
pub fn fuzzy_match(text: &str, query: &str) -> bool {
    let mut pending = query.chars().peekable();
    for c in text.chars() {
        match pending.peek() {
            Some(&q) if q == c => {
                pending.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    pending.peek().is_none()
}

/// Relevance of `text` for `query`; both are expected lowercased.
///
/// `+100` for a substring hit, `+50` for a prefix hit, then per
/// whitespace-delimited word `+75` for an exact word and `+25` for a word
/// prefix, minus `0.1` per character of `text`. Never negative.
pub fn relevance_score(text: &str, query: &str) -> f64 {
    let mut score = 0.0;
    if text.contains(query) {
        score += 100.0;
    }
    if text.starts_with(query) {
        score += 50.0;
    }
    for word in text.split_whitespace() {
        if word == query {
            score += 75.0;
        }
        if word.starts_with(query) {
            score += 25.0;
        }
    }
    score -= 0.1 * text.chars().count() as f64;
    score.max(0.0)
}

fn entry_matches(entry: &IndexEntry, query: &str, options: &SearchOptions) -> bool {
    let haystack = if options.case_sensitive {
        entry.original.as_str()
    } else {
        entry.text.as_str()
    };
    if options.exact_match {
        haystack.contains(query)
    } else {
        fuzzy_match(haystack, query)
    }
}

/// Rank every matching entry, best first, truncated to `options.limit`.
///
/// This does not touch search history; [`crate::QueryEngine::text_search`]
/// records the query on top of calling this.
pub fn text_search(index: &SearchIndex, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = if options.case_sensitive {
        query.to_string()
    } else {
        query.to_lowercase()
    };
    let scoring_query = query.to_lowercase();

    let mut results: Vec<SearchResult> = index
        .entries()
        .iter()
        .filter(|entry| options.includes(entry.kind))
        .filter(|entry| entry_matches(entry, &needle, options))
        .map(|entry| SearchResult {
            kind: entry.kind,
            entity: entry.entity.clone(),
            score: relevance_score(&entry.text, &scoring_query),
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(options.limit);
    results
}

// ============================================================================
// Criteria-based search
// ============================================================================

/// Field-by-field search: every listed field must match.
///
/// `id`, `label`, `type`, `source` and `target` address the entity; any other
/// field name addresses a property. A missing field is compared as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    pub fields: BTreeMap<String, ValueMatch>,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn field(mut self, name: impl Into<String>, want: ValueMatch) -> Self {
        self.fields.insert(name.into(), want);
        self
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        if self.kind.is_some_and(|k| k != entity.kind()) {
            return false;
        }
        self.fields.iter().all(|(name, want)| {
            let value = entity.field(name).unwrap_or(Value::Null);
            want.matches(&value)
        })
    }
}

pub fn search_by_criteria(index: &SearchIndex, criteria: &SearchCriteria) -> Vec<Entity> {
    index
        .entries()
        .iter()
        .filter(|entry| criteria.matches(&entry.entity))
        .map(|entry| entry.entity.clone())
        .collect()
}
