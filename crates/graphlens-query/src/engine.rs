//! `QueryEngine`: one owned instance per graph view.
//!
//! The engine keeps the last snapshot it was handed, the search index built
//! from it, and the session bookkeeping (history, filter sets, saved searches,
//! result cache). Nothing is global; two engines never share state unless
//! they are given the same persistence port.
//!
//! The index is only as fresh as the last `build_index` / `update_index`
//! call. A stale index returns stale results; it never errors.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::filter::{apply_filters, FilterConfig, FilterResult};
use crate::filter_sets::{FilterHistoryEntry, FilterSets, NamedFilterSet};
use crate::history::{suggest, SearchHistory};
use crate::index::{IndexStats, SearchIndex};
use crate::model::{Entity, GraphSnapshot, Node, NodeId};
use crate::persistence::PersistencePort;
use crate::saved_search::{SavedSearch, SavedSearches};
use crate::search::{search_by_criteria, text_search, SearchCriteria, SearchOptions, SearchResult};
use crate::traversal::{DegreeKind, GraphTraversal, PathOptions, TraversalOptions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub nodes: usize,
    pub edges: usize,
    pub index: IndexStats,
    pub filter_sets: usize,
    pub active_filter_sets: usize,
    pub saved_searches: usize,
    pub history: usize,
    pub cached_searches: usize,
}

pub struct QueryEngine {
    config: EngineConfig,
    snapshot: GraphSnapshot,
    index: SearchIndex,
    history: SearchHistory,
    filter_sets: FilterSets,
    saved: SavedSearches,
    cache: ResultCache,
    port: Option<Arc<dyn PersistencePort>>,
}

impl fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEngine")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .field("persistent", &self.port.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl QueryEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            history: SearchHistory::with_limit(config.search_history_limit),
            filter_sets: FilterSets::with_history_limit(config.filter_history_limit),
            cache: ResultCache::new(config.cache_capacity),
            snapshot: GraphSnapshot::default(),
            index: SearchIndex::new(),
            saved: SavedSearches::new(),
            port: None,
            config,
        }
    }

    /// An engine whose filter sets and saved searches are written through `port`.
    ///
    /// Nothing is read from the port until [`QueryEngine::restore`] is called.
    pub fn with_persistence(config: EngineConfig, port: Arc<dyn PersistencePort>) -> Self {
        let mut engine = Self::new(config);
        engine.port = Some(port);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    // ========================================================================
    // Index
    // ========================================================================

    /// Replace the snapshot and rebuild the index from scratch.
    pub fn build_index(&mut self, snapshot: GraphSnapshot) {
        self.index.build(&snapshot.nodes, &snapshot.edges);
        self.snapshot = snapshot;
        self.cache.clear();
    }

    /// Same as [`QueryEngine::build_index`]; there is no incremental path.
    pub fn update_index(&mut self, snapshot: GraphSnapshot) {
        self.build_index(snapshot);
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Ranked text search. Every non-empty query lands in the history, cached or not.
    pub fn text_search(&mut self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        if query.is_empty() {
            return Vec::new();
        }
        self.history.add(query);
        if let Some(hit) = self.cache.get(query, options) {
            return hit.clone();
        }
        let results = text_search(&self.index, query, options);
        self.cache.insert(query, options, results.clone());
        results
    }

    /// [`QueryEngine::text_search`] with default options and the configured limit.
    pub fn search(&mut self, query: &str) -> Vec<SearchResult> {
        let options = self.default_search_options();
        self.text_search(query, &options)
    }

    pub fn default_search_options(&self) -> SearchOptions {
        SearchOptions {
            limit: self.config.default_search_limit,
            ..SearchOptions::default()
        }
    }

    pub fn search_by_criteria(&self, criteria: &SearchCriteria) -> Vec<Entity> {
        search_by_criteria(&self.index, criteria)
    }

    pub fn get_suggestions(&self, prefix: &str, limit: usize) -> Vec<String> {
        suggest(&self.index, prefix, limit)
    }

    pub fn add_to_history(&mut self, query: &str) {
        self.history.add(query);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> Vec<String> {
        self.history.to_vec()
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    pub fn find_connected_nodes(&self, start: &NodeId, options: &TraversalOptions) -> Vec<Node> {
        GraphTraversal::from_snapshot(&self.snapshot).find_connected_nodes(start, options)
    }

    /// Shortest path; `max_depth` falls back to the configured default.
    pub fn find_path(&self, source: &NodeId, target: &NodeId, max_depth: Option<usize>) -> Option<Vec<NodeId>> {
        let options = PathOptions {
            max_depth: max_depth.unwrap_or(self.config.default_path_depth),
        };
        GraphTraversal::from_snapshot(&self.snapshot).find_path(source, target, &options)
    }

    pub fn degree(&self, id: &NodeId, kind: DegreeKind) -> usize {
        GraphTraversal::from_snapshot(&self.snapshot).degree(id, kind)
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    pub fn apply_filters(&self, config: &FilterConfig) -> FilterResult {
        apply_filters(&self.snapshot.nodes, &self.snapshot.edges, config)
    }

    pub fn apply_all_active_filters(&self) -> FilterResult {
        self.filter_sets
            .apply_all_active(&self.snapshot.nodes, &self.snapshot.edges)
    }

    /// Store an active set and return the re-applied view of all active sets.
    pub fn create_filter_set(&mut self, name: &str, config: FilterConfig) -> Result<FilterResult> {
        let mut sets = self.filter_sets.clone();
        sets.create(name, config);
        self.commit_filter_sets(sets)?;
        Ok(self.apply_all_active_filters())
    }

    pub fn update_filter_set(&mut self, name: &str, config: FilterConfig) -> Result<()> {
        let mut sets = self.filter_sets.clone();
        sets.update(name, config)?;
        self.commit_filter_sets(sets)
    }

    pub fn toggle_filter_set(&mut self, name: &str, active: Option<bool>) -> Result<bool> {
        let mut sets = self.filter_sets.clone();
        let now_active = sets.toggle(name, active)?;
        self.commit_filter_sets(sets)?;
        Ok(now_active)
    }

    pub fn remove_filter_set(&mut self, name: &str) -> Result<NamedFilterSet> {
        let mut sets = self.filter_sets.clone();
        let removed = sets.remove(name)?;
        self.commit_filter_sets(sets)?;
        Ok(removed)
    }

    pub fn clear_filter_sets(&mut self) -> Result<()> {
        let mut sets = self.filter_sets.clone();
        sets.clear();
        self.commit_filter_sets(sets)
    }

    pub fn filter_sets(&self) -> &FilterSets {
        &self.filter_sets
    }

    pub fn filter_history(&self) -> Vec<FilterHistoryEntry> {
        self.filter_sets.history().cloned().collect()
    }

    pub fn export_filter_sets(&self) -> Result<String> {
        self.filter_sets.export()
    }

    pub fn import_filter_sets(&mut self, json: &str) -> Result<usize> {
        let mut sets = self.filter_sets.clone();
        let count = sets.import(json)?;
        self.commit_filter_sets(sets)?;
        Ok(count)
    }

    // ========================================================================
    // Saved searches
    // ========================================================================

    pub fn save_search(&mut self, name: &str, query: &str, options: SearchOptions) -> Result<()> {
        let mut saved = self.saved.clone();
        saved.save(name, query, options);
        self.commit_saved_searches(saved)
    }

    /// Re-run a saved search. Records history and stamps `last_run`.
    pub fn execute_saved_search(&mut self, name: &str) -> Result<Vec<SearchResult>> {
        let mut saved = self.saved.clone();
        let search = saved.mark_run(name)?;
        self.commit_saved_searches(saved)?;
        Ok(self.text_search(&search.query, &search.options))
    }

    pub fn remove_saved_search(&mut self, name: &str) -> Result<SavedSearch> {
        let mut saved = self.saved.clone();
        let removed = saved.remove(name)?;
        self.commit_saved_searches(saved)?;
        Ok(removed)
    }

    pub fn saved_searches(&self) -> &SavedSearches {
        &self.saved
    }

    pub fn export_saved_searches(&self) -> Result<String> {
        self.saved.export()
    }

    pub fn import_saved_searches(&mut self, json: &str) -> Result<usize> {
        let mut saved = self.saved.clone();
        let count = saved.import(json)?;
        self.commit_saved_searches(saved)?;
        Ok(count)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write filter sets and saved searches through the port, if any.
    pub fn persist(&self) -> Result<()> {
        self.write_filter_sets(&self.filter_sets)?;
        self.write_saved_searches(&self.saved)?;
        if self.port.is_some() {
            tracing::info!(
                filter_sets = self.filter_sets.len(),
                saved_searches = self.saved.len(),
                "persisted engine state"
            );
        }
        Ok(())
    }

    /// Load filter sets and saved searches from the port.
    ///
    /// Both payloads are parsed before either is applied, so a malformed one
    /// leaves the engine unchanged. Missing keys leave that part untouched.
    pub fn restore(&mut self) -> Result<()> {
        let Some(port) = self.port.clone() else {
            return Ok(());
        };
        let sets_json = port.get(&self.config.filter_sets_key)?;
        let saved_json = port.get(&self.config.saved_searches_key)?;

        let mut sets = self.filter_sets.clone();
        let mut saved = self.saved.clone();
        if let Some(json) = &sets_json {
            sets.restore(json).inspect_err(|err| {
                tracing::warn!(key = %self.config.filter_sets_key, error = %err, "malformed persisted filter sets");
            })?;
        }
        if let Some(json) = &saved_json {
            saved.restore(json).inspect_err(|err| {
                tracing::warn!(key = %self.config.saved_searches_key, error = %err, "malformed persisted saved searches");
            })?;
        }
        self.filter_sets = sets;
        self.saved = saved;
        Ok(())
    }

    /// Write `sets` through the port and adopt them only once the write succeeds.
    fn commit_filter_sets(&mut self, sets: FilterSets) -> Result<()> {
        self.write_filter_sets(&sets)?;
        self.filter_sets = sets;
        Ok(())
    }

    fn commit_saved_searches(&mut self, saved: SavedSearches) -> Result<()> {
        self.write_saved_searches(&saved)?;
        self.saved = saved;
        Ok(())
    }

    fn write_filter_sets(&self, sets: &FilterSets) -> Result<()> {
        let Some(port) = &self.port else {
            return Ok(());
        };
        port.set(&self.config.filter_sets_key, &sets.to_json()?)
    }

    fn write_saved_searches(&self, saved: &SavedSearches) -> Result<()> {
        let Some(port) = &self.port else {
            return Ok(());
        };
        port.set(&self.config.saved_searches_key, &saved.to_json()?)
    }

    // ========================================================================
    // Stats
    // ========================================================================

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            nodes: self.snapshot.nodes.len(),
            edges: self.snapshot.edges.len(),
            index: self.index.stats(),
            filter_sets: self.filter_sets.len(),
            active_filter_sets: self.filter_sets.active().count(),
            saved_searches: self.saved.len(),
            history: self.history.len(),
            cached_searches: self.cache.len(),
        }
    }
}
