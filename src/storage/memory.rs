//! In-memory store with the same change notifications as [`super::SledStore`]. Nothing
//! survives the process.

use super::{ChangeNotifier, KeyValueStore, StorageChange};
use crate::error::StorageError;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    changes: ChangeNotifier,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
            changes: ChangeNotifier::new(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.write().insert(key.to_string(), value.to_string());
        self.changes.notify(StorageChange::Set(key.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().remove(key);
        self.changes.notify(StorageChange::Removed(key.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.values.write().clear();
        self.changes.notify(StorageChange::Cleared);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
