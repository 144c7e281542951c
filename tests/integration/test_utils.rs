//! Shared test utilities for integration tests
//!
//! Stub gateways, a background context wired over an in-process channel, a recording
//! panel renderer, and environment isolation for configuration tests.

use async_trait::async_trait;
use groovemate::dispatcher::{Dispatcher, DispatcherSettings};
use groovemate::error::{GatewayError, LifecycleError};
use groovemate::gateway::{
    ChatMessage, CompletionOptions, GatewayFactory, GenerationGateway, TicketingGateway,
};
use groovemate::lifecycle::PanelRenderer;
use groovemate::model::{Article, Customer, PageInfo, Ticket, TicketStatus};
use groovemate::page::ElementHandle;
use groovemate::storage::{CredentialCache, KeyValueStore, MemoryStore};
use groovemate::transport::{context_channel, RetryPolicy, Transport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Scripted behavior shared by every gateway a [`StubGateways`] hands out
#[derive(Default)]
pub struct StubState {
    pub generation_reply: String,
    pub ticketing_fails: bool,
    pub tickets: HashMap<String, Ticket>,
    pub histories: HashMap<String, Vec<Ticket>>,
    pub articles: Vec<Article>,
    pub calls: Vec<String>,
    pub keys_seen: Vec<String>,
}

#[derive(Clone, Default)]
pub struct StubGateways {
    pub state: Arc<Mutex<StubState>>,
}

impl StubGateways {
    pub fn with_reply(reply: &str) -> Self {
        let stub = Self::default();
        stub.state.lock().generation_reply = reply.to_string();
        stub
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }

    fn ticketing_result(&self) -> Result<(), GatewayError> {
        if self.state.lock().ticketing_fails {
            Err(GatewayError::Upstream {
                service: "Groove",
                status: 500,
                message: "Internal Server Error".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GenerationGateway for StubGateways {
    async fn chat_completion(
        &self,
        model: &str,
        _messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<String, GatewayError> {
        self.record(format!("chat:{}", model));
        Ok(self.state.lock().generation_reply.clone())
    }
}

#[async_trait]
impl TicketingGateway for StubGateways {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, GatewayError> {
        self.record(format!("get_ticket:{}", ticket_id));
        self.ticketing_result()?;
        self.state
            .lock()
            .tickets
            .get(ticket_id)
            .cloned()
            .ok_or(GatewayError::Upstream {
                service: "Groove",
                status: 404,
                message: "Not Found".to_string(),
            })
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, GatewayError> {
        self.record(format!("get_customer:{}", customer_id));
        self.ticketing_result()?;
        Ok(Customer {
            id: customer_id.to_string(),
            name: String::new(),
            email: customer_id.to_string(),
        })
    }

    async fn get_customer_tickets(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<Ticket>, GatewayError> {
        self.record(format!("history:{}:{}", customer_id, limit));
        self.ticketing_result()?;
        Ok(self
            .state
            .lock()
            .histories
            .get(customer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_note(&self, ticket_id: &str, _text: &str) -> Result<(), GatewayError> {
        self.record(format!("note:{}", ticket_id));
        self.ticketing_result()
    }

    async fn update_status(&self, ticket_id: &str, status: TicketStatus) -> Result<(), GatewayError> {
        self.record(format!("status:{}:{}", ticket_id, status));
        self.ticketing_result()
    }

    async fn search_articles(&self, query: &str, _limit: u32) -> Result<Vec<Article>, GatewayError> {
        self.record(format!("articles:{}", query));
        self.ticketing_result()?;
        Ok(self.state.lock().articles.clone())
    }
}

impl GatewayFactory for StubGateways {
    fn generation(&self, api_key: &str) -> Result<Arc<dyn GenerationGateway>, GatewayError> {
        self.state.lock().keys_seen.push(api_key.to_string());
        Ok(Arc::new(self.clone()))
    }

    fn ticketing(&self, api_key: &str) -> Result<Arc<dyn TicketingGateway>, GatewayError> {
        self.state.lock().keys_seen.push(api_key.to_string());
        Ok(Arc::new(self.clone()))
    }
}

/// Background context served over an in-process channel
pub struct Background {
    pub store: Arc<MemoryStore>,
    pub credentials: Arc<CredentialCache>,
    pub gateways: StubGateways,
    pub dispatcher: Arc<Dispatcher>,
    pub transport: Transport,
}

/// Start a dispatcher on the current runtime with the given stored keys.
pub fn spawn_background(keys: &[(&str, &str)], gateways: StubGateways) -> Background {
    let store = Arc::new(MemoryStore::new());
    for (key, value) in keys {
        store.set(key, value).unwrap();
    }
    let credentials = Arc::new(CredentialCache::new(store.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        credentials.clone(),
        Arc::new(gateways.clone()),
        DispatcherSettings::default(),
    ));

    let (channel, inbox) = context_channel(16);
    tokio::spawn(Arc::clone(&dispatcher).serve(inbox));

    Background {
        store,
        credentials,
        gateways,
        dispatcher,
        transport: Transport::new(Arc::new(channel), RetryPolicy::default()),
    }
}

pub fn ticket(number: u64, customer_id: &str) -> Ticket {
    Ticket {
        id: number.to_string(),
        number: Some(number),
        subject: format!("Ticket {}", number),
        status: TicketStatus::Closed,
        customer: Customer {
            id: customer_id.to_string(),
            name: "Jane Doe".to_string(),
            email: customer_id.to_string(),
        },
        messages: Vec::new(),
        created_at: None,
        updated_at: None,
    }
}

/// Panel renderer that records mounts and fails the first `failures` of them
#[derive(Default)]
pub struct RecordingRenderer {
    failures: AtomicU32,
    pub mounts: AtomicU32,
    pub unmounts: AtomicU32,
    pub mounted_pages: Mutex<Vec<PageInfo>>,
}

impl RecordingRenderer {
    pub fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicU32::new(failures),
            ..Self::default()
        })
    }

    pub fn mounts(&self) -> u32 {
        self.mounts.load(Ordering::SeqCst)
    }

    pub fn unmounts(&self) -> u32 {
        self.unmounts.load(Ordering::SeqCst)
    }
}

impl PanelRenderer for RecordingRenderer {
    fn mount(&self, _container: &ElementHandle, page: &PageInfo) -> Result<(), LifecycleError> {
        self.mounts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(LifecycleError::Render("panel failed to render".to_string()));
        }
        self.mounted_pages.lock().push(page.clone());
        Ok(())
    }

    fn unmount(&self) {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Global mutex to serialize environment variable access across tests
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with XDG_CONFIG_HOME pointed at `test_dir` and `vars` set.
///
/// Every variable touched is restored afterwards.
pub fn with_config_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let mut saved: Vec<(String, Option<String>)> = vec![(
        "XDG_CONFIG_HOME".to_string(),
        std::env::var("XDG_CONFIG_HOME").ok(),
    )];
    saved.extend(
        vars.iter()
            .map(|(name, _)| (name.to_string(), std::env::var(name).ok())),
    );

    std::env::set_var("XDG_CONFIG_HOME", test_dir.path());
    for (name, value) in vars {
        std::env::set_var(name, value);
    }

    let result = f();

    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(&name, value),
            None => std::env::remove_var(&name),
        }
    }
    result
}
