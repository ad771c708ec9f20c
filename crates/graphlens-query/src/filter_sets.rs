//! Named filter sets and the filter action history.
//!
//! Sets are keyed by name and kept in a `BTreeMap`, so "all active sets" is
//! always folded in name order. Active sets compose as an intersection
//! pipeline: each set filters the previous set's output.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_FILTER_HISTORY_LIMIT;
use crate::error::{QueryError, Result};
use crate::filter::{apply_filters, FilterConfig, FilterResult};
use crate::model::{Edge, Node};

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedFilterSet {
    pub config: FilterConfig,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported: Option<DateTime<Utc>>,
}

impl NamedFilterSet {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            active: true,
            created: Utc::now(),
            updated: None,
            imported: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Create,
    Update,
    Remove,
    Toggle,
    Import,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterHistoryEntry {
    pub action: FilterAction,
    /// Set name; `None` for whole-collection actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FilterSets {
    sets: BTreeMap<String, NamedFilterSet>,
    history: VecDeque<FilterHistoryEntry>,
    history_limit: usize,
}

impl Default for FilterSets {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_FILTER_HISTORY_LIMIT)
    }
}

impl FilterSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            sets: BTreeMap::new(),
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Store `config` under `name` as an active set, replacing any existing one.
    pub fn create(&mut self, name: impl Into<String>, config: FilterConfig) {
        let name = name.into();
        self.record(FilterAction::Create, Some(&name));
        self.sets.insert(name, NamedFilterSet::new(config));
    }

    /// Merge the parts of `config` that are present into the existing set.
    pub fn update(&mut self, name: &str, config: FilterConfig) -> Result<()> {
        let set = self
            .sets
            .get_mut(name)
            .ok_or_else(|| QueryError::FilterSetNotFound(name.to_string()))?;
        set.config.merge(config);
        set.updated = Some(Utc::now());
        self.record(FilterAction::Update, Some(name));
        Ok(())
    }

    /// Flip the active flag, or set it when `active` is given. Returns the new state.
    pub fn toggle(&mut self, name: &str, active: Option<bool>) -> Result<bool> {
        let set = self
            .sets
            .get_mut(name)
            .ok_or_else(|| QueryError::FilterSetNotFound(name.to_string()))?;
        set.active = active.unwrap_or(!set.active);
        let now_active = set.active;
        self.record(FilterAction::Toggle, Some(name));
        Ok(now_active)
    }

    pub fn remove(&mut self, name: &str) -> Result<NamedFilterSet> {
        let removed = self
            .sets
            .remove(name)
            .ok_or_else(|| QueryError::FilterSetNotFound(name.to_string()))?;
        self.record(FilterAction::Remove, Some(name));
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.sets.clear();
        self.record(FilterAction::Clear, None);
    }

    pub fn get(&self, name: &str) -> Option<&NamedFilterSet> {
        self.sets.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NamedFilterSet)> {
        self.sets.iter().map(|(name, set)| (name.as_str(), set))
    }

    pub fn active(&self) -> impl Iterator<Item = (&str, &NamedFilterSet)> {
        self.iter().filter(|(_, set)| set.active)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Fold every active set over the input, in name order.
    ///
    /// With no active sets the input comes back unfiltered.
    pub fn apply_all_active(&self, nodes: &[Node], edges: &[Edge]) -> FilterResult {
        let mut result = FilterResult::unfiltered(nodes, edges);
        for (name, set) in self.active() {
            let step = apply_filters(&result.nodes, &result.edges, &set.config);
            tracing::debug!(
                filter_set = name,
                nodes_out = step.stats.nodes_out,
                edges_out = step.stats.edges_out,
                "applied filter set"
            );
            result.nodes = step.nodes;
            result.edges = step.edges;
        }
        result.stats.nodes_out = result.nodes.len();
        result.stats.edges_out = result.edges.len();
        result
    }

    /// All sets as a JSON object keyed by name. Custom predicates are dropped.
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.sets)
            .map_err(|e| QueryError::config("failed to export filter sets", e))
    }

    /// Parse `json` fully, then merge it in.
    ///
    /// A malformed payload changes nothing. Imported sets are active unless the
    /// payload says otherwise and carry an `imported` stamp. Returns the number
    /// of sets merged.
    pub fn import(&mut self, json: &str) -> Result<usize> {
        let parsed: BTreeMap<String, NamedFilterSet> = serde_json::from_str(json)
            .map_err(|e| QueryError::config("invalid filter set import", e))?;
        let count = parsed.len();
        let now = Utc::now();
        for (name, mut set) in parsed {
            set.imported = Some(now);
            self.sets.insert(name, set);
        }
        self.record(FilterAction::Import, None);
        tracing::info!(count, "imported filter sets");
        Ok(count)
    }

    /// Replace every set with the persisted ones. History is untouched.
    pub(crate) fn restore(&mut self, json: &str) -> Result<()> {
        self.sets = serde_json::from_str(json)
            .map_err(|e| QueryError::config("invalid persisted filter sets", e))?;
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.sets)
            .map_err(|e| QueryError::config("failed to serialize filter sets", e))
    }

    /// Filter actions, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &FilterHistoryEntry> {
        self.history.iter()
    }

    fn record(&mut self, action: FilterAction, name: Option<&str>) {
        self.history.push_front(FilterHistoryEntry {
            action,
            name: name.map(str::to_string),
            timestamp: Utc::now(),
        });
        self.history.truncate(self.history_limit);
    }
}
