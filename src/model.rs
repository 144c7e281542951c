//! Domain entities shared by every context.
//!
//! All of these are transient and per-request. Field names serialize in camelCase because
//! they cross the context boundary as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one detection pass over the current page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub is_ticket_page: bool,
    pub ticket_id: Option<String>,
    pub customer_email: Option<String>,
    pub url: String,
}

impl PageInfo {
    pub fn not_ticket(url: impl Into<String>) -> Self {
        Self {
            is_ticket_page: false,
            ticket_id: None,
            customer_email: None,
            url: url.into(),
        }
    }
}

/// Ticket state as understood by the agent UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Closed,
    Spam,
    #[serde(other)]
    Unknown,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Closed => "closed",
            TicketStatus::Spam => "spam",
            TicketStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    Agent,
    Customer,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    pub id: String,
    pub body: String,
    pub author: String,
    pub author_type: AuthorType,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub number: Option<u64>,
    pub subject: String,
    pub status: TicketStatus,
    pub customer: Customer,
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Number shown to agents; Groove URLs carry the number, not the internal id.
    pub fn display_number(&self) -> String {
        self.number
            .map(|n| n.to_string())
            .unwrap_or_else(|| self.id.clone())
    }

    /// First message written by the customer, used as the ticket body.
    pub fn first_customer_message(&self) -> Option<&TicketMessage> {
        self.messages
            .iter()
            .find(|m| m.author_type == AuthorType::Customer && !m.body.trim().is_empty())
    }
}

/// Knowledge-base article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
}
