//! Groove REST API client (v1).
//!
//! Groove addresses tickets by their number and customers by email address; both are
//! carried through the core as opaque string ids.

use super::{map_http_error, TicketingGateway, GROOVE};
use crate::error::GatewayError;
use crate::model::{Article, AuthorType, Customer, Ticket, TicketMessage, TicketStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

#[derive(Deserialize)]
struct TicketEnvelope {
    ticket: GrooveTicket,
}

#[derive(Deserialize)]
struct TicketsEnvelope {
    #[serde(default)]
    tickets: Vec<GrooveTicket>,
}

#[derive(Deserialize)]
struct CustomerEnvelope {
    customer: GrooveCustomer,
}

#[derive(Deserialize)]
struct MessagesEnvelope {
    #[serde(default)]
    messages: Vec<GrooveMessage>,
}

#[derive(Deserialize)]
struct ArticlesEnvelope {
    #[serde(default)]
    articles: Vec<GrooveArticle>,
}

#[derive(Deserialize)]
struct GrooveTicket {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    customer: Option<GrooveCustomer>,
    #[serde(default)]
    links: GrooveLinks,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
struct GrooveLinks {
    customer: Option<GrooveLink>,
    author: Option<GrooveLink>,
}

#[derive(Deserialize)]
struct GrooveLink {
    href: String,
}

impl GrooveLink {
    fn tail(&self) -> &str {
        self.href.rsplit('/').next().unwrap_or(&self.href)
    }
}

#[derive(Deserialize, Default)]
struct GrooveCustomer {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Deserialize)]
struct GrooveMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    plain_text_body: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    note: bool,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    links: GrooveLinks,
}

#[derive(Deserialize)]
struct GrooveArticle {
    id: serde_json::Value,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Groove `state` values folded into the agent-facing status
pub fn status_from_state(state: &str) -> TicketStatus {
    match state {
        "unread" | "opened" | "pending" => TicketStatus::Active,
        "closed" => TicketStatus::Closed,
        "spam" => TicketStatus::Spam,
        _ => TicketStatus::Unknown,
    }
}

fn state_for_status(status: TicketStatus) -> Option<&'static str> {
    match status {
        TicketStatus::Active => Some("opened"),
        TicketStatus::Closed => Some("closed"),
        TicketStatus::Spam => Some("spam"),
        TicketStatus::Unknown => None,
    }
}

impl GrooveCustomer {
    fn into_customer(self, fallback_id: Option<&str>) -> Customer {
        let email = self.email.unwrap_or_default();
        let id = self
            .id
            .or_else(|| (!email.is_empty()).then(|| email.clone()))
            .or_else(|| fallback_id.map(str::to_string))
            .unwrap_or_default();
        let name = self.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| {
            [self.first_name, self.last_name]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });
        Customer { id, name, email }
    }
}

impl GrooveTicket {
    fn into_ticket(self, messages: Vec<TicketMessage>) -> Ticket {
        let link_id = self.links.customer.as_ref().map(|l| l.tail().to_string());
        let customer = self
            .customer
            .unwrap_or_default()
            .into_customer(link_id.as_deref());
        Ticket {
            id: self.number.to_string(),
            number: Some(self.number),
            subject: self.title.or(self.summary).unwrap_or_default(),
            status: status_from_state(&self.state),
            customer,
            messages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl GrooveMessage {
    fn into_message(self, index: usize) -> TicketMessage {
        let author = self
            .links
            .author
            .as_ref()
            .map(|link| link.href.clone())
            .unwrap_or_default();
        let author_type = if self.note || author.contains("/agents/") {
            AuthorType::Agent
        } else if author.contains("/customers/") {
            AuthorType::Customer
        } else {
            AuthorType::System
        };
        TicketMessage {
            id: self.id.unwrap_or_else(|| index.to_string()),
            body: self.plain_text_body.or(self.body).unwrap_or_default(),
            author: author.rsplit('/').next().unwrap_or_default().to_string(),
            author_type,
            timestamp: self.created_at,
        }
    }
}

pub struct GrooveClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GrooveClient {
    pub fn new(client: Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Base URL extended by `segments`, each percent-encoded as a single path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let invalid = |message: String| GatewayError::InvalidRequest {
            service: GROOVE,
            message,
        };
        if let Some(bad) = segments
            .iter()
            .find(|segment| segment.is_empty() || matches!(**segment, "." | ".."))
        {
            return Err(invalid(format!("invalid path segment '{}'", bad)));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| invalid(format!("base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("base URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| map_http_error(GROOVE, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string();
            error!(status = status.as_u16(), error = %message, "Groove API error");
            return Err(GatewayError::Upstream {
                service: GROOVE,
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        self.execute(request)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode {
                service: GROOVE,
                message: e.to_string(),
            })
    }

    async fn get_messages(&self, ticket_id: &str) -> Result<Vec<TicketMessage>, GatewayError> {
        let envelope: MessagesEnvelope = self
            .get_json(self.client.get(self.url(&["tickets", ticket_id, "messages"])?))
            .await?;
        Ok(envelope
            .messages
            .into_iter()
            .enumerate()
            .map(|(index, message)| message.into_message(index))
            .collect())
    }
}

#[async_trait]
impl TicketingGateway for GrooveClient {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, GatewayError> {
        debug!(ticket_id, "Fetching ticket");
        let envelope: TicketEnvelope = self
            .get_json(self.client.get(self.url(&["tickets", ticket_id])?))
            .await?;

        let messages = match self.get_messages(ticket_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(ticket_id, error = %e, "Ticket messages unavailable");
                Vec::new()
            }
        };
        Ok(envelope.ticket.into_ticket(messages))
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Customer, GatewayError> {
        debug!(customer_id, "Fetching customer");
        let envelope: CustomerEnvelope = self
            .get_json(self.client.get(self.url(&["customers", customer_id])?))
            .await?;
        Ok(envelope.customer.into_customer(Some(customer_id)))
    }

    async fn get_customer_tickets(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> Result<Vec<Ticket>, GatewayError> {
        debug!(customer_id, limit, "Fetching customer tickets");
        let request = self
            .client
            .get(self.url(&["tickets"])?)
            .query(&[("customer", customer_id.to_string()), ("per_page", limit.to_string())]);
        let envelope: TicketsEnvelope = self.get_json(request).await?;
        Ok(envelope
            .tickets
            .into_iter()
            .take(limit as usize)
            .map(|ticket| ticket.into_ticket(Vec::new()))
            .collect())
    }

    async fn add_note(&self, ticket_id: &str, text: &str) -> Result<(), GatewayError> {
        debug!(ticket_id, "Adding note");
        let request = self
            .client
            .post(self.url(&["tickets", ticket_id, "messages"])?)
            .json(&json!({ "body": text, "note": true }));
        self.execute(request).await.map(|_| ())
    }

    async fn update_status(&self, ticket_id: &str, status: TicketStatus) -> Result<(), GatewayError> {
        let state = state_for_status(status).ok_or_else(|| GatewayError::InvalidRequest {
            service: GROOVE,
            message: format!("status '{}' cannot be set", status),
        })?;
        debug!(ticket_id, state, "Updating ticket state");
        let request = self
            .client
            .put(self.url(&["tickets", ticket_id, "state"])?)
            .json(&json!({ "state": state }));
        self.execute(request).await.map(|_| ())
    }

    async fn search_articles(&self, query: &str, limit: u32) -> Result<Vec<Article>, GatewayError> {
        debug!(query, limit, "Searching knowledge base");
        let request = self
            .client
            .get(self.url(&["kb", "articles"])?)
            .query(&[("query", query.to_string()), ("per_page", limit.to_string())]);
        let envelope: ArticlesEnvelope = self.get_json(request).await?;
        Ok(envelope
            .articles
            .into_iter()
            .take(limit as usize)
            .map(|article| Article {
                id: match article.id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
                title: article.title,
                content: article.content.or(article.body).unwrap_or_default(),
                category: article.category.unwrap_or_else(|| "General".to_string()),
            })
            .collect())
    }
}
