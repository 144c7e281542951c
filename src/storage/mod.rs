//! Persistent key/value storage and the credential cache built on it.

use crate::error::StorageError;
use tokio::sync::broadcast;

pub mod credentials;
pub mod memory;
pub mod persistence;

pub use credentials::{CredentialCache, Credentials};
pub use memory::MemoryStore;
pub use persistence::SledStore;

/// Storage key holding the generation service credential.
pub const GROQ_API_KEY: &str = "groqApiKey";

/// Storage key holding the ticketing service credential.
pub const GROOVE_API_KEY: &str = "grooveApiKey";

const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// Notification emitted after every successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageChange {
    Set(String),
    Removed(String),
    Cleared,
}

impl StorageChange {
    pub fn touches(&self, key: &str) -> bool {
        match self {
            StorageChange::Set(k) | StorageChange::Removed(k) => k == key,
            StorageChange::Cleared => true,
        }
    }
}

/// Flat key→value store shared by every context
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;

    /// Subscribe to change notifications for mutations made after this call.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Fan-out of [`StorageChange`] events; sending with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<StorageChange>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn notify(&self, change: StorageChange) {
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
