//! Process-wide API credentials.
//!
//! Credentials are loaded lazily from the [`KeyValueStore`] on first use and cached until
//! [`CredentialCache::invalidate`] or [`CredentialCache::reload`] is called. A storage
//! change to either credential key invalidates the cache when the watcher from
//! [`CredentialCache::spawn_invalidation`] is running.

use super::{KeyValueStore, GROOVE_API_KEY, GROQ_API_KEY};
use crate::error::StorageError;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Opaque bearer credentials for the two external services
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub groq_api_key: Option<String>,
    pub groove_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("groq_api_key", &self.groq_api_key.as_deref().map(mask))
            .field("groove_api_key", &self.groove_api_key.as_deref().map(mask))
            .finish()
    }
}

/// Show only the last four characters of a secret.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub struct CredentialCache {
    store: Arc<dyn KeyValueStore>,
    cached: RwLock<Option<Credentials>>,
    /// Bumped by every invalidation; a load only caches if it saw no bump.
    generation: AtomicU64,
}

impl CredentialCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Cached credentials, loading them on first use.
    ///
    /// A storage failure is logged and reported as "no credentials"; nothing is cached so
    /// the next call retries the load.
    pub fn current(&self) -> Credentials {
        if let Some(credentials) = self.cached.read().as_ref() {
            return credentials.clone();
        }
        match self.reload() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Failed to load credentials from storage");
                Credentials::default()
            }
        }
    }

    pub fn groq_api_key(&self) -> Option<String> {
        let key = self.current().groq_api_key;
        if key.is_none() {
            warn!("Groq API key not found in storage");
        }
        key
    }

    pub fn groove_api_key(&self) -> Option<String> {
        let key = self.current().groove_api_key;
        if key.is_none() {
            warn!("Groove API key not found in storage");
        }
        key
    }

    /// Read both credentials from storage and replace the cached copy.
    ///
    /// If the cache is invalidated while the read is in flight, the result is returned but
    /// not cached, so the next call reads storage again.
    pub fn reload(&self) -> Result<Credentials, StorageError> {
        let started = self.generation.load(Ordering::Acquire);
        let credentials = Credentials {
            groq_api_key: non_blank(self.store.get(GROQ_API_KEY)?),
            groove_api_key: non_blank(self.store.get(GROOVE_API_KEY)?),
        };
        debug!(?credentials, "Credentials loaded");
        let mut cached = self.cached.write();
        if self.generation.load(Ordering::Acquire) == started {
            *cached = Some(credentials.clone());
        } else {
            debug!("Credentials changed during load, not caching");
        }
        Ok(credentials)
    }

    pub fn invalidate(&self) {
        let mut cached = self.cached.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        *cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.read().is_some()
    }

    /// Invalidate the cache whenever a credential key changes in storage.
    pub fn spawn_invalidation(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let mut changes = self.store.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.touches(GROQ_API_KEY) || change.touches(GROOVE_API_KEY) {
                            info!(?change, "Credential storage changed, invalidating cache");
                            cache.invalidate();
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed storage notifications, invalidating cache");
                        cache.invalidate();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
