//! Cross-context wire protocol.
//!
//! A request is a closed tagged union over [`OperationKind`]; on the wire it is
//! `{"type": "CHECK_QUALITY", "payload": {...}}`. Every reply is a [`Response`] envelope:
//! `{"success": bool, <data field>?, "error"?: string}`.

use crate::model::{Article, PageInfo, Ticket, TicketStatus};
use crate::quality::QualityCheckResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error text returned for a `type` outside the closed set.
pub const UNKNOWN_OPERATION: &str = "unknown operation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    PageDetected,
    CheckQuality,
    GenerateSuggestion,
    FetchTicketData,
    FetchCustomerHistory,
    AddNote,
    UpdateStatus,
    SearchArticles,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::PageDetected => "PAGE_DETECTED",
            OperationKind::CheckQuality => "CHECK_QUALITY",
            OperationKind::GenerateSuggestion => "GENERATE_SUGGESTION",
            OperationKind::FetchTicketData => "FETCH_TICKET_DATA",
            OperationKind::FetchCustomerHistory => "FETCH_CUSTOMER_HISTORY",
            OperationKind::AddNote => "ADD_NOTE",
            OperationKind::UpdateStatus => "UPDATE_STATUS",
            OperationKind::SearchArticles => "SEARCH_ARTICLES",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheckPayload {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionPayload {
    pub subject: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRef {
    pub ticket_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    pub ticket_id: String,
    pub note_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub ticket_id: String,
    pub status: TicketStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// A request from any sender context to the background dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    PageDetected(PageInfo),
    CheckQuality(QualityCheckPayload),
    GenerateSuggestion(SuggestionPayload),
    FetchTicketData(TicketRef),
    FetchCustomerHistory(HistoryQuery),
    AddNote(NotePayload),
    UpdateStatus(StatusChange),
    SearchArticles(ArticleQuery),
}

/// Why a raw wire message could not become a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown operation")]
    UnknownOperation(String),

    #[error("invalid payload: {message}")]
    InvalidPayload {
        kind: OperationKind,
        message: String,
    },
}

impl Request {
    pub fn kind(&self) -> OperationKind {
        match self {
            Request::PageDetected(_) => OperationKind::PageDetected,
            Request::CheckQuality(_) => OperationKind::CheckQuality,
            Request::GenerateSuggestion(_) => OperationKind::GenerateSuggestion,
            Request::FetchTicketData(_) => OperationKind::FetchTicketData,
            Request::FetchCustomerHistory(_) => OperationKind::FetchCustomerHistory,
            Request::AddNote(_) => OperationKind::AddNote,
            Request::UpdateStatus(_) => OperationKind::UpdateStatus,
            Request::SearchArticles(_) => OperationKind::SearchArticles,
        }
    }

    /// Decode a raw wire message, separating unknown kinds from malformed payloads.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let type_field = value.get("type").cloned().unwrap_or(Value::Null);
        let kind: OperationKind = match serde_json::from_value(type_field.clone()) {
            Ok(kind) => kind,
            Err(_) => {
                let name = type_field.as_str().unwrap_or_default().to_string();
                return Err(DecodeError::UnknownOperation(name));
            }
        };

        serde_json::from_value(value).map_err(|e| DecodeError::InvalidPayload {
            kind,
            message: e.to_string(),
        })
    }
}

/// Operation-specific data carried by a successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Quality { data: QualityCheckResult },
    Suggestion { suggestion: String },
    Ticket { ticket: Ticket },
    Tickets { tickets: Vec<Ticket> },
    Articles { articles: Vec<Article> },
    Message { message: String },
    Empty {},
}

/// Uniform success/failure envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(flatten)]
    pub body: ResponseBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the body is locally synthesized mock/demo data.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub demo: bool,
}

impl Response {
    fn ok(body: ResponseBody) -> Self {
        Self {
            success: true,
            body,
            error: None,
            demo: false,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(ResponseBody::Message {
            message: message.into(),
        })
    }

    pub fn quality(data: QualityCheckResult) -> Self {
        Self::ok(ResponseBody::Quality { data })
    }

    pub fn suggestion(suggestion: impl Into<String>) -> Self {
        Self::ok(ResponseBody::Suggestion {
            suggestion: suggestion.into(),
        })
    }

    pub fn ticket(ticket: Ticket) -> Self {
        Self::ok(ResponseBody::Ticket { ticket })
    }

    pub fn tickets(tickets: Vec<Ticket>) -> Self {
        Self::ok(ResponseBody::Tickets { tickets })
    }

    pub fn articles(articles: Vec<Article>) -> Self {
        Self::ok(ResponseBody::Articles { articles })
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            body: ResponseBody::Empty {},
            error: Some(error.into()),
            demo: false,
        }
    }

    /// Mark the body as mock/demo data.
    pub fn as_demo(mut self) -> Self {
        self.demo = true;
        self
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message_text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Message { message } => Some(message),
            _ => None,
        }
    }

    pub fn quality_result(&self) -> Option<&QualityCheckResult> {
        match &self.body {
            ResponseBody::Quality { data } => Some(data),
            _ => None,
        }
    }

    pub fn suggestion_text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Suggestion { suggestion } => Some(suggestion),
            _ => None,
        }
    }

    pub fn ticket_data(&self) -> Option<&Ticket> {
        match &self.body {
            ResponseBody::Ticket { ticket } => Some(ticket),
            _ => None,
        }
    }

    pub fn ticket_list(&self) -> Option<&[Ticket]> {
        match &self.body {
            ResponseBody::Tickets { tickets } => Some(tickets),
            _ => None,
        }
    }

    pub fn article_list(&self) -> Option<&[Article]> {
        match &self.body {
            ResponseBody::Articles { articles } => Some(articles),
            _ => None,
        }
    }

    /// Split the envelope into its body or its error text.
    pub fn into_result(self) -> Result<ResponseBody, String> {
        if self.success {
            Ok(self.body)
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "request failed without an error message".to_string()))
        }
    }
}
