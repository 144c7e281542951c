//! Ticket body resolution.
//!
//! The body of the customer's message can come from several places of varying
//! reliability. Each place is a [`BodySource`]; a chain of them is tried in order and the
//! first non-empty text wins.

use super::dom::Document;
use crate::model::Ticket;
use tracing::debug;

pub const DEFAULT_SUBJECT: &str = "Customer Support Request";
pub const DEFAULT_BODY: &str = "Customer needs help with their account";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    /// Body already known from structured data (API ticket or caller input).
    Structured(Option<String>),
    /// Text scraped from the first matching selector.
    Selectors(Vec<String>),
    /// Synthesized from the subject when nothing better exists.
    Placeholder { subject: Option<String> },
}

impl BodySource {
    /// Structured body from the first customer message of `ticket`.
    pub fn from_ticket(ticket: Option<&Ticket>) -> Self {
        BodySource::Structured(
            ticket
                .and_then(Ticket::first_customer_message)
                .map(|message| message.body.clone()),
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            BodySource::Structured(_) => "structured",
            BodySource::Selectors(_) => "selectors",
            BodySource::Placeholder { .. } => "placeholder",
        }
    }

    pub fn extract(&self, document: &dyn Document) -> Option<String> {
        let text = match self {
            BodySource::Structured(body) => body.clone(),
            BodySource::Selectors(selectors) => selectors
                .iter()
                .filter_map(|selector| document.query_text(selector))
                .find(|text| !text.trim().is_empty()),
            BodySource::Placeholder { subject } => Some(placeholder_body(subject.as_deref())),
        };
        text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
    }
}

fn placeholder_body(subject: Option<&str>) -> String {
    match subject.map(str::trim).filter(|s| !s.is_empty()) {
        Some(subject) => format!("Customer needs help with: {}", subject),
        None => DEFAULT_BODY.to_string(),
    }
}

/// Resolved text and the name of the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub source: &'static str,
    pub text: String,
}

/// Try each source in order; first non-empty wins.
pub fn first_non_empty(sources: &[BodySource], document: &dyn Document) -> Option<Resolved> {
    let resolved = sources.iter().find_map(|source| {
        source.extract(document).map(|text| Resolved {
            source: source.name(),
            text,
        })
    });
    if let Some(resolved) = &resolved {
        debug!(source = resolved.source, "Ticket body resolved");
    }
    resolved
}
