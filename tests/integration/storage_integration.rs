//! Integration tests for persistent storage and the credential cache

use groovemate::storage::{
    CredentialCache, KeyValueStore, SledStore, StorageChange, GROOVE_API_KEY, GROQ_API_KEY,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_values_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store");

    {
        let store = SledStore::open(&path).unwrap();
        store.set(GROQ_API_KEY, "gsk_persisted").unwrap();
        store.set("theme", "dark").unwrap();
        store.remove("theme").unwrap();
    }

    let store = Arc::new(SledStore::open(&path).unwrap());
    assert_eq!(store.get(GROQ_API_KEY).unwrap().as_deref(), Some("gsk_persisted"));
    assert_eq!(store.get("theme").unwrap(), None);

    let credentials = CredentialCache::new(store).current();
    assert_eq!(credentials.groq_api_key.as_deref(), Some("gsk_persisted"));
    assert_eq!(credentials.groove_api_key, None);
}

#[test]
fn test_blank_credentials_count_as_missing() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SledStore::open(temp_dir.path().join("store")).unwrap());
    store.set(GROOVE_API_KEY, "   ").unwrap();

    let cache = CredentialCache::new(store);
    assert_eq!(cache.groove_api_key(), None);
}

#[tokio::test]
async fn test_mutations_are_broadcast() {
    let temp_dir = TempDir::new().unwrap();
    let store = SledStore::open(temp_dir.path().join("store")).unwrap();
    let mut changes = store.subscribe();

    store.set(GROOVE_API_KEY, "token").unwrap();
    store.clear().unwrap();

    assert_eq!(
        changes.recv().await.unwrap(),
        StorageChange::Set(GROOVE_API_KEY.to_string())
    );
    assert_eq!(changes.recv().await.unwrap(), StorageChange::Cleared);
}

#[tokio::test]
async fn test_cache_follows_storage_changes() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SledStore::open(temp_dir.path().join("store")).unwrap());
    store.set(GROQ_API_KEY, "gsk_old").unwrap();

    let cache = Arc::new(CredentialCache::new(store.clone()));
    let watcher = cache.spawn_invalidation();
    assert_eq!(cache.groq_api_key().as_deref(), Some("gsk_old"));

    // Unrelated keys leave the cache alone.
    store.set("panelCollapsed", "true").unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cache.is_cached());

    store.set(GROQ_API_KEY, "gsk_new").unwrap();
    for _ in 0..50 {
        if !cache.is_cached() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cache.groq_api_key().as_deref(), Some("gsk_new"));

    watcher.abort();
}
