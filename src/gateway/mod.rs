//! External service gateways.
//!
//! Two HTTP services back the dispatcher: the Groove ticketing API and the Groq chat
//! completion API. Both sit behind traits so the dispatcher can be driven by stubs, and
//! both are built per call from the current credential through a [`GatewayFactory`].

use crate::config::EndpointConfig;
use crate::error::GatewayError;
use crate::model::{Article, Customer, Ticket, TicketStatus};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub mod generation;
pub mod ticketing;

pub use generation::{ChatMessage, CompletionOptions, GroqClient, MessageRole};
pub use ticketing::GrooveClient;

pub const GROQ: &str = "Groq";
pub const GROOVE: &str = "Groove";

#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Text of the first choice.
    async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<String, GatewayError>;
}

#[async_trait]
pub trait TicketingGateway: Send + Sync {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, GatewayError>;

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, GatewayError>;

    async fn get_customer_tickets(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<Ticket>, GatewayError>;

    async fn add_note(&self, ticket_id: &str, text: &str) -> Result<(), GatewayError>;

    async fn update_status(&self, ticket_id: &str, status: TicketStatus) -> Result<(), GatewayError>;

    async fn search_articles(&self, query: &str, limit: u32) -> Result<Vec<Article>, GatewayError>;
}

/// Builds gateways for a given credential
pub trait GatewayFactory: Send + Sync {
    fn generation(&self, api_key: &str) -> Result<Arc<dyn GenerationGateway>, GatewayError>;

    fn ticketing(&self, api_key: &str) -> Result<Arc<dyn TicketingGateway>, GatewayError>;
}

/// Factory for the real HTTP clients; one connection pool shared by both services.
pub struct HttpGatewayFactory {
    client: Client,
    endpoints: EndpointConfig,
}

impl HttpGatewayFactory {
    pub fn new(endpoints: &EndpointConfig) -> Result<Self, GatewayError> {
        let client = build_http_client(endpoints.connect_timeout(), endpoints.request_timeout())?;
        Ok(Self {
            client,
            endpoints: endpoints.clone(),
        })
    }
}

impl GatewayFactory for HttpGatewayFactory {
    fn generation(&self, api_key: &str) -> Result<Arc<dyn GenerationGateway>, GatewayError> {
        Ok(Arc::new(GroqClient::new(
            self.client.clone(),
            self.endpoints.groq_chat_url.clone(),
            api_key.to_string(),
        )))
    }

    fn ticketing(&self, api_key: &str) -> Result<Arc<dyn TicketingGateway>, GatewayError> {
        Ok(Arc::new(GrooveClient::new(
            self.client.clone(),
            self.endpoints.groove_base_url.clone(),
            api_key.to_string(),
        )))
    }
}

pub fn build_http_client(connect_timeout: Duration, timeout: Duration) -> Result<Client, GatewayError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Client(e.to_string()))
}

pub(crate) fn map_http_error(service: &'static str, error: reqwest::Error) -> GatewayError {
    let message = if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection error: {}", error)
    } else {
        format!("HTTP error: {}", error)
    };
    GatewayError::Http { service, message }
}
