//! Sled-backed key/value store

use super::{ChangeNotifier, KeyValueStore, StorageChange};
use crate::error::StorageError;
use std::path::Path;
use tokio::sync::broadcast;
use tracing::debug;

/// Sled-based implementation of [`KeyValueStore`]
///
/// Values are stored as UTF-8 bytes in the default tree.
pub struct SledStore {
    db: sled::Db,
    changes: ChangeNotifier,
}

impl SledStore {
    /// Open (or create) a store at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::Backend(format!("Failed to open sled database: {}", e))
        })?;
        Ok(Self {
            db,
            changes: ChangeNotifier::new(),
        })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    StorageError::InvalidValue {
                        key: key.to_string(),
                    }
                })?;
                debug!(key, "Storage get");
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        self.flush()?;
        self.changes.notify(StorageChange::Set(key.to_string()));
        debug!(key, "Storage set");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.db.remove(key.as_bytes())?;
        self.flush()?;
        self.changes.notify(StorageChange::Removed(key.to_string()));
        debug!(key, "Storage removed");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.db.clear()?;
        self.flush()?;
        self.changes.notify(StorageChange::Cleared);
        debug!("Storage cleared");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
