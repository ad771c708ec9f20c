//! GraphLens storage adapters.
//!
//! [`JsonFileStore`] backs the engine's [`PersistencePort`] with one JSON file:
//! a flat object of key to stored string. Every `set` rewrites the whole file
//! through a sibling temp file and a rename, so readers never observe a
//! half-written document. A failed write leaves the in-memory map as it was.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use graphlens_query::{PersistencePort, QueryError};
use parking_lot::RwLock;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StorageError> for QueryError {
    fn from(err: StorageError) -> Self {
        QueryError::Storage(err.to_string())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open `path`, loading it if it exists. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| StorageError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "opened json store");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    pub fn remove(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut values = self.values.write();
        if !values.contains_key(key) {
            return Ok(None);
        }
        let mut next = values.clone();
        let removed = next.remove(key);
        self.flush(&next)?;
        *values = next;
        Ok(removed)
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(values).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), keys = values.len(), "flushed json store");
        Ok(())
    }
}

impl PersistencePort for JsonFileStore {
    fn get(&self, key: &str) -> graphlens_query::Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> graphlens_query::Result<()> {
        let mut values = self.values.write();
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next).map_err(|err| {
            tracing::warn!(key, error = %err, "failed to persist key");
            QueryError::from(err)
        })?;
        *values = next;
        Ok(())
    }
}
