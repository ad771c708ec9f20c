//! Named text searches that can be re-run later.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::search::SearchOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub query: String,
    #[serde(default)]
    pub options: SearchOptions,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct SavedSearches {
    searches: BTreeMap<String, SavedSearch>,
}

impl SavedSearches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save (or overwrite) a search under `name`.
    pub fn save(&mut self, name: impl Into<String>, query: impl Into<String>, options: SearchOptions) {
        self.searches.insert(
            name.into(),
            SavedSearch {
                query: query.into(),
                options,
                created: Utc::now(),
                last_run: None,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&SavedSearch> {
        self.searches.get(name)
    }

    /// Stamp `last_run` and hand back what to run.
    pub fn mark_run(&mut self, name: &str) -> Result<SavedSearch> {
        let saved = self
            .searches
            .get_mut(name)
            .ok_or_else(|| QueryError::SavedSearchNotFound(name.to_string()))?;
        saved.last_run = Some(Utc::now());
        Ok(saved.clone())
    }

    pub fn remove(&mut self, name: &str) -> Result<SavedSearch> {
        self.searches
            .remove(name)
            .ok_or_else(|| QueryError::SavedSearchNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SavedSearch)> {
        self.searches.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.searches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }

    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.searches)
            .map_err(|e| QueryError::config("failed to export saved searches", e))
    }

    /// Parse all of `json` before merging any of it.
    pub fn import(&mut self, json: &str) -> Result<usize> {
        let parsed: BTreeMap<String, SavedSearch> = serde_json::from_str(json)
            .map_err(|e| QueryError::config("invalid saved search import", e))?;
        let count = parsed.len();
        self.searches.extend(parsed);
        tracing::info!(count, "imported saved searches");
        Ok(count)
    }

    pub(crate) fn restore(&mut self, json: &str) -> Result<()> {
        self.searches = serde_json::from_str(json)
            .map_err(|e| QueryError::config("invalid persisted saved searches", e))?;
        Ok(())
    }

    pub(crate) fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.searches)
            .map_err(|e| QueryError::config("failed to serialize saved searches", e))
    }
}
