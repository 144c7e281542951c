//! CLI route: single route table and run context.

use crate::cli::parse::{Commands, ConfigCommands, CredentialCommands};
use crate::config::{ConfigLoader, GrooveMateConfig};
use crate::dispatcher::{Dispatcher, DispatcherSettings};
use crate::error::ConfigError;
use crate::gateway::HttpGatewayFactory;
use crate::page::{MemoryDocument, PageDetector};
use crate::protocol::Request;
use crate::storage::credentials::mask;
use crate::storage::{
    CredentialCache, KeyValueStore, SledStore, GROOVE_API_KEY, GROQ_API_KEY,
};
use crate::transport::{context_channel, RetryPolicy, Transport};
use anyhow::{bail, Context};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Runtime context for CLI execution: the effective configuration and lazily opened storage.
pub struct RunContext {
    config: GrooveMateConfig,
}

impl RunContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config })
    }

    pub fn from_config(config: GrooveMateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GrooveMateConfig {
        &self.config
    }

    fn open_store(&self) -> anyhow::Result<Arc<SledStore>> {
        let path = self.config.storage.resolve_path()?;
        debug!(path = %path.display(), "Opening store");
        let store = SledStore::open(&path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        Ok(Arc::new(store))
    }

    pub async fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        match command {
            Commands::Detect { url } => self.detect(url),
            Commands::Dispatch { request } => self.dispatch(request.as_deref()).await,
            Commands::Credentials { command } => self.credentials(command),
            Commands::Config {
                command: ConfigCommands::Show,
            } => Ok(toml::to_string_pretty(&self.config)?),
        }
    }

    fn detect(&self, url: &str) -> anyhow::Result<String> {
        let document = Arc::new(MemoryDocument::new(url));
        let detector = PageDetector::new(document, &self.config.page)?;
        Ok(serde_json::to_string_pretty(&detector.detect())?)
    }

    async fn dispatch(&self, raw: Option<&str>) -> anyhow::Result<String> {
        let raw = match raw {
            Some(raw) => raw.to_string(),
            None => {
                let mut buffer = String::new();
                tokio::io::stdin().read_to_string(&mut buffer).await?;
                buffer
            }
        };
        let value: Value = serde_json::from_str(&raw).context("request is not valid JSON")?;

        let credentials = Arc::new(CredentialCache::new(self.open_store()?));
        let gateways = Arc::new(HttpGatewayFactory::new(&self.config.endpoints)?);
        let dispatcher = Arc::new(Dispatcher::new(
            credentials,
            gateways,
            DispatcherSettings::from(&self.config),
        ));

        let response = match Request::from_value(value.clone()) {
            Ok(request) => {
                let (channel, inbox) = context_channel(8);
                let background = tokio::spawn(Arc::clone(&dispatcher).serve(inbox));
                let transport = Transport::new(
                    Arc::new(channel),
                    RetryPolicy::from(&self.config.transport),
                );
                let response = transport.send(request).await?;
                drop(transport);
                background.await?;
                response
            }
            // Let the dispatcher produce the failure envelope.
            Err(_) => dispatcher.handle_value(value).await,
        };

        Ok(serde_json::to_string_pretty(&response)?)
    }

    fn credentials(&self, command: &CredentialCommands) -> anyhow::Result<String> {
        let store = self.open_store()?;
        match command {
            CredentialCommands::Set {
                groq_key,
                groove_key,
            } => {
                if groq_key.is_none() && groove_key.is_none() {
                    bail!("nothing to set: pass --groq-key and/or --groove-key");
                }
                let mut saved = Vec::new();
                if let Some(key) = groq_key {
                    store.set(GROQ_API_KEY, key.trim())?;
                    saved.push(GROQ_API_KEY);
                }
                if let Some(key) = groove_key {
                    store.set(GROOVE_API_KEY, key.trim())?;
                    saved.push(GROOVE_API_KEY);
                }
                info!(keys = ?saved, "Credentials saved");
                Ok(format!("Saved {}", saved.join(", ")))
            }
            CredentialCommands::Show => {
                let credentials = CredentialCache::new(store).reload()?;
                let show = |key: &Option<String>| {
                    key.as_deref()
                        .map(mask)
                        .unwrap_or_else(|| "(not set)".to_string())
                };
                Ok(format!(
                    "{}: {}\n{}: {}",
                    GROQ_API_KEY,
                    show(&credentials.groq_api_key),
                    GROOVE_API_KEY,
                    show(&credentials.groove_api_key)
                ))
            }
            CredentialCommands::Clear => {
                store.remove(GROQ_API_KEY)?;
                store.remove(GROOVE_API_KEY)?;
                info!("Credentials cleared");
                Ok("Credentials cleared".to_string())
            }
        }
    }
}
