//! Key-value persistence port.
//!
//! The engine only ever stores JSON strings under a couple of well-known keys
//! (see [`crate::EngineConfig`]). Adapters decide where those strings live.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::Result;

pub trait PersistencePort: Send + Sync {
    /// `Ok(None)` when nothing has been stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process store; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<AHashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl PersistencePort for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
