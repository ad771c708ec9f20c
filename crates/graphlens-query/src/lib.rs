//! GraphLens query engine: search, traversal and filtering over a
//! property-graph snapshot.
//!
//! The engine never owns the canonical graph. Callers hand it a read-only
//! [`GraphSnapshot`] and get plain values back.
//!
//! ## Module Organization
//!
//! - `index`: searchable text blobs for every node and edge
//! - `search`: fuzzy/exact ranked text search and criteria search
//! - `traversal`: BFS neighborhoods, shortest paths, degree counts
//! - `operator`: the comparison grammar (`eq`, `between`, `regex`, ...)
//! - `filter`: multi-criteria node/edge filtering with edge cascade
//! - `filter_sets`, `history`, `saved_search`: session bookkeeping
//! - `persistence`: the key-value port bookkeeping is written through
//! - `engine`: [`QueryEngine`], the owned facade over all of the above

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod filter_sets;
pub mod history;
pub mod index;
pub mod model;
pub mod operator;
pub mod persistence;
pub mod saved_search;
pub mod search;
pub mod traversal;

// Re-export key types
pub use config::EngineConfig;
pub use engine::{EngineStats, QueryEngine};
pub use error::{QueryError, Result};
pub use filter::{
    apply_filters, DegreeFilter, EdgeCriteria, FilterConfig, FilterResult, FilterStats,
    NodeCriteria, Predicate, TextCriterion, TextFilter, TextMode,
};
pub use filter_sets::{FilterAction, FilterHistoryEntry, FilterSets, NamedFilterSet};
pub use history::{suggest, SearchHistory};
pub use index::{extract_searchable_text, IndexEntry, IndexStats, SearchIndex};
pub use model::{Edge, EdgeId, Entity, EntityId, EntityKind, GraphSnapshot, Node, NodeId};
pub use operator::{apply_operator, try_apply_operator, Operator, ValueMatch};
pub use persistence::{MemoryStore, PersistencePort};
pub use saved_search::{SavedSearch, SavedSearches};
pub use search::{
    fuzzy_match, relevance_score, search_by_criteria, text_search, SearchCriteria,
    SearchOptions, SearchResult,
};
pub use traversal::{DegreeKind, DegreeTable, Direction, GraphTraversal, PathOptions, TraversalOptions};
