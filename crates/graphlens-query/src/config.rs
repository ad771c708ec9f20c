//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

pub const DEFAULT_SEARCH_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_FILTER_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_SEARCH_LIMIT: usize = 100;
pub const DEFAULT_PATH_DEPTH: usize = 10;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
pub const FILTER_SETS_KEY: &str = "graphlens.filterSets";
pub const SAVED_SEARCHES_KEY: &str = "graphlens.savedSearches";

/// Tunables for a [`crate::QueryEngine`].
///
/// Every field is optional in JSON; missing fields take the defaults above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub search_history_limit: usize,
    pub filter_history_limit: usize,
    pub default_search_limit: usize,
    pub default_path_depth: usize,
    /// Maximum memoized searches; `0` disables the cache.
    pub cache_capacity: usize,
    /// Persistence key for named filter sets.
    pub filter_sets_key: String,
    /// Persistence key for saved searches.
    pub saved_searches_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_history_limit: DEFAULT_SEARCH_HISTORY_LIMIT,
            filter_history_limit: DEFAULT_FILTER_HISTORY_LIMIT,
            default_search_limit: DEFAULT_SEARCH_LIMIT,
            default_path_depth: DEFAULT_PATH_DEPTH,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            filter_sets_key: FILTER_SETS_KEY.to_string(),
            saved_searches_key: SAVED_SEARCHES_KEY.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| QueryError::config("invalid engine config", e))
    }
}
