//! Bounded memoization of text search results.
//!
//! Keys are `(query, options)`. Insertion order is tracked so that when the
//! cache grows past capacity the oldest ~30% of keys are dropped in one pass.

use std::collections::VecDeque;

use ahash::AHashMap;

use crate::search::{SearchOptions, SearchResult};

type CacheKey = (String, SearchOptions);

#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    capacity: usize,
    entries: AHashMap<CacheKey, Vec<SearchResult>>,
    order: VecDeque<CacheKey>,
}

impl ResultCache {
    /// A capacity of `0` disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: AHashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn get(&self, query: &str, options: &SearchOptions) -> Option<&Vec<SearchResult>> {
        self.entries.get(&(query.to_string(), options.clone()))
    }

    pub fn insert(&mut self, query: &str, options: &SearchOptions, results: Vec<SearchResult>) {
        if !self.is_enabled() {
            return;
        }
        let key = (query.to_string(), options.clone());
        if self.entries.insert(key.clone(), results).is_none() {
            self.order.push_back(key);
        }
        if self.entries.len() > self.capacity {
            self.evict();
        }
    }

    fn evict(&mut self) {
        let drop_count = (self.entries.len() * 3 / 10).max(1);
        for key in self.order.drain(..drop_count.min(self.order.len())) {
            self.entries.remove(&key);
        }
        tracing::debug!(evicted = drop_count, remaining = self.entries.len(), "search cache evicted");
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
