//! Most-recent-first search history and prefix suggestions.

use std::collections::VecDeque;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SEARCH_HISTORY_LIMIT;
use crate::index::SearchIndex;

/// Distinct queries, newest first, capped at `limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistory {
    entries: VecDeque<String>,
    limit: usize,
}

impl Default for SearchHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_SEARCH_HISTORY_LIMIT)
    }
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Record `query` as the most recent entry.
    ///
    /// Empty queries and repeats of the current head are ignored; an older
    /// occurrence is moved to the front.
    pub fn add(&mut self, query: &str) {
        if query.is_empty() || self.entries.front().is_some_and(|head| head == query) {
            return;
        }
        self.entries.retain(|q| q != query);
        self.entries.push_front(query.to_string());
        self.entries.truncate(self.limit);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Distinct index words that extend `prefix`, in index order.
///
/// Matching is on the lowercased prefix; a word equal to the prefix is not a
/// suggestion.
pub fn suggest(index: &SearchIndex, prefix: &str, limit: usize) -> Vec<String> {
    if prefix.is_empty() || limit == 0 {
        return Vec::new();
    }
    let prefix = prefix.to_lowercase();
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut out = Vec::new();
    for word in index.tokens() {
        if word.len() > prefix.len() && word.starts_with(&prefix) && seen.insert(word) {
            out.push(word.to_string());
            if out.len() == limit {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, Node};

    #[test]
    fn dedup_moves_to_front() {
        let mut history = SearchHistory::new();
        for q in ["raid", "nas", "raid", "", "raid"] {
            history.add(q);
        }
        assert_eq!(history.to_vec(), vec!["raid", "nas"]);
    }

    #[test]
    fn capped_at_limit() {
        let mut history = SearchHistory::with_limit(2);
        for q in ["a", "b", "c"] {
            history.add(q);
        }
        assert_eq!(history.to_vec(), vec!["c", "b"]);
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn suggestions_extend_the_prefix() {
        let nodes = vec![
            Node::new(EntityId::Int(1)).with_label("Storage Stor"),
            Node::new(EntityId::Int(2)).with_label("storage stack"),
        ];
        let index = SearchIndex::from_parts(&nodes, &[]);
        assert_eq!(suggest(&index, "STor", 10), vec!["storage"]);
        assert_eq!(suggest(&index, "st", 10), vec!["storage", "stor", "stack"]);
        assert_eq!(suggest(&index, "st", 1), vec!["storage"]);
        assert!(suggest(&index, "", 10).is_empty());
    }
}
