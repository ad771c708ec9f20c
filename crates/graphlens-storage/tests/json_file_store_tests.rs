use std::sync::Arc;

use graphlens_query::{PersistencePort, QueryError};
use graphlens_storage::{JsonFileStore, StorageError};
use tempfile::tempdir;

#[test]
fn values_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("graphlens.json");

    let store = JsonFileStore::open(&path).unwrap();
    assert_eq!(store.get("graphlens.filterSets").unwrap(), None);
    store.set("graphlens.filterSets", "{}").unwrap();
    store.set("graphlens.savedSearches", r#"{"a":{"query":"nas"}}"#).unwrap();
    drop(store);

    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.get("graphlens.filterSets").unwrap().as_deref(), Some("{}"));
    assert_eq!(reopened.keys().len(), 2);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn remove_rewrites_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kv.json");
    let store = JsonFileStore::open(&path).unwrap();
    store.set("k", "v").unwrap();
    assert_eq!(store.remove("k").unwrap().as_deref(), Some("v"));
    assert_eq!(store.remove("k").unwrap(), None);

    let reopened = JsonFileStore::open(&path).unwrap();
    assert!(reopened.keys().is_empty());
}

#[test]
fn corrupt_file_is_a_json_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kv.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JsonFileStore::open(&path).unwrap_err();
    assert!(matches!(err, StorageError::Json { .. }));
    assert!(matches!(QueryError::from(err), QueryError::Storage(_)));
}

#[test]
fn usable_as_shared_port() {
    let dir = tempdir().unwrap();
    let port: Arc<dyn PersistencePort> = Arc::new(JsonFileStore::open(dir.path().join("kv.json")).unwrap());
    port.set("x", "1").unwrap();
    assert_eq!(port.get("x").unwrap().as_deref(), Some("1"));
}

#[test]
fn failed_set_leaves_memory_unchanged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kv.json");
    let store = JsonFileStore::open(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let err = store.set("k", "v").unwrap_err();
    assert!(matches!(err, QueryError::Storage(_)));
    assert_eq!(store.get("k").unwrap(), None);
    assert!(store.keys().is_empty());
}

#[test]
fn failed_remove_keeps_the_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kv.json");
    let store = JsonFileStore::open(&path).unwrap();
    store.set("k", "v").unwrap();
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let err = store.remove("k").unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));
    assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
}
