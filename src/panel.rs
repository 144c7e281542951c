//! Panel context client.
//!
//! Everything the agent-facing panel asks of the background goes through [`PanelClient`].
//! Reads that have a sensible stand-in (history, articles) never fail; writes the agent
//! expects to "just work" (notes, status) report a local outcome instead of an error.

use crate::config::{split_selectors, PageConfig};
use crate::demo;
use crate::error::PanelError;
use crate::model::{Article, PageInfo, Ticket, TicketStatus};
use crate::page::extract::DEFAULT_SUBJECT;
use crate::page::{first_non_empty, BodySource, Document};
use crate::protocol::{
    ArticleQuery, HistoryQuery, NotePayload, OperationKind, QualityCheckPayload, Request,
    Response, StatusChange, SuggestionPayload, TicketRef,
};
use crate::quality::QualityCheckResult;
use crate::transport::Transport;
use chrono::Utc;
use tracing::{debug, info, warn};

pub const HISTORY_LIMIT: u32 = 10;
pub const ARTICLE_LIMIT: u32 = 5;

/// What the agent knows about the ticket when asking for a suggestion
#[derive(Debug, Clone, Default)]
pub struct SuggestionContext {
    pub subject: Option<String>,
    /// Ticket fetched from the API, if any; its first customer message is the body.
    pub ticket: Option<Ticket>,
    /// Body supplied directly, preferred over the ticket's.
    pub body: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Api,
    Demo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub tickets: Vec<Ticket>,
    pub source: DataSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleResults {
    pub articles: Vec<Article>,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOutcome {
    Added,
    SavedLocally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Updated,
    /// Applied in the panel only; the ticketing service was not updated.
    Local,
}

pub struct PanelClient {
    transport: Transport,
    page: PageInfo,
    body_selectors: Vec<String>,
}

impl PanelClient {
    pub fn new(transport: Transport, page: PageInfo, config: &PageConfig) -> Self {
        Self {
            transport,
            page,
            body_selectors: split_selectors(&config.selectors.ticket_body),
        }
    }

    pub fn page(&self) -> &PageInfo {
        &self.page
    }

    async fn call(&self, request: Request) -> Result<Response, PanelError> {
        let operation = request.kind().as_str();
        let response = self.transport.send(request).await?;
        if response.success {
            Ok(response)
        } else {
            Err(PanelError::Rejected {
                operation,
                message: response
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }

    fn ticket_id(&self) -> Result<&str, PanelError> {
        self.page
            .ticket_id
            .as_deref()
            .ok_or_else(|| PanelError::Validation("No ticket is open".to_string()))
    }

    pub async fn check_quality(&self, text: &str) -> Result<QualityCheckResult, PanelError> {
        if text.trim().is_empty() {
            return Err(PanelError::Validation(
                "Please enter some text to check quality".to_string(),
            ));
        }

        let response = self
            .call(Request::CheckQuality(QualityCheckPayload {
                text: text.to_string(),
            }))
            .await?;
        let result = response
            .quality_result()
            .cloned()
            .ok_or(PanelError::UnexpectedResponse(OperationKind::CheckQuality.as_str()))?;
        info!(score = result.score, "Quality check completed");
        Ok(result)
    }

    pub async fn generate_suggestion(
        &self,
        context: SuggestionContext,
        document: &dyn Document,
    ) -> Result<String, PanelError> {
        let subject = context
            .subject
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| context.ticket.as_ref().map(|t| t.subject.clone()))
            .filter(|s| !s.trim().is_empty());

        let structured = match context.body.clone().filter(|b| !b.trim().is_empty()) {
            Some(body) => BodySource::Structured(Some(body)),
            None => BodySource::from_ticket(context.ticket.as_ref()),
        };
        let sources = [
            structured,
            BodySource::Selectors(self.body_selectors.clone()),
            BodySource::Placeholder {
                subject: subject.clone(),
            },
        ];
        let message = first_non_empty(&sources, document)
            .map(|resolved| resolved.text)
            .unwrap_or_default();

        let customer_name = context.customer_name.or_else(|| {
            context
                .ticket
                .as_ref()
                .map(|t| t.customer.name.clone())
                .filter(|n| !n.trim().is_empty())
        });

        let payload = SuggestionPayload {
            subject: subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            message,
            customer_name,
            customer_email: context.customer_email.or_else(|| self.page.customer_email.clone()),
            category: context.category,
            priority: context.priority,
            style: context.style,
        };

        let response = self.call(Request::GenerateSuggestion(payload)).await?;
        let suggestion = response
            .suggestion_text()
            .map(str::to_string)
            .ok_or(PanelError::UnexpectedResponse(
                OperationKind::GenerateSuggestion.as_str(),
            ))?;
        info!("Suggestion generated");
        Ok(suggestion)
    }

    async fn customer_history(&self, customer_id: &str) -> Result<Vec<Ticket>, PanelError> {
        let response = self
            .call(Request::FetchCustomerHistory(HistoryQuery {
                customer_id: customer_id.to_string(),
                limit: Some(HISTORY_LIMIT),
            }))
            .await?;
        Ok(response.ticket_list().map(<[Ticket]>::to_vec).unwrap_or_default())
    }

    /// Past tickets for the customer, newest first, without the current one.
    ///
    /// Tries the customer id, then the customer of `ticket_id`, then falls back to demo
    /// history.
    pub async fn load_history(
        &self,
        customer_id: Option<&str>,
        ticket_id: Option<&str>,
    ) -> HistoryView {
        if let Some(customer_id) = usable(customer_id) {
            match self.customer_history(customer_id).await {
                Ok(tickets) if !tickets.is_empty() => {
                    return history_view(tickets, ticket_id, DataSource::Api);
                }
                Ok(_) => debug!(customer_id, "No history by customer id"),
                Err(e) => warn!(customer_id, error = %e, "Customer history fetch failed"),
            }
        }

        if let Some(current) = usable(ticket_id) {
            match self.history_via_ticket(current).await {
                Ok(Some(tickets)) => return history_view(tickets, ticket_id, DataSource::Api),
                Ok(None) => debug!(ticket_id = current, "Ticket has no customer id"),
                Err(e) => warn!(ticket_id = current, error = %e, "History fetch via ticket failed"),
            }
        }

        warn!("Showing demo history");
        history_view(demo::history(Utc::now()), ticket_id, DataSource::Demo)
    }

    async fn history_via_ticket(&self, ticket_id: &str) -> Result<Option<Vec<Ticket>>, PanelError> {
        let response = self
            .call(Request::FetchTicketData(TicketRef {
                ticket_id: ticket_id.to_string(),
            }))
            .await?;
        let customer_id = match response.ticket_data() {
            Some(ticket) if !ticket.customer.id.is_empty() => ticket.customer.id.clone(),
            _ => return Ok(None),
        };
        self.customer_history(&customer_id).await.map(Some)
    }

    pub async fn search_articles(&self, query: &str) -> ArticleResults {
        let query = query.trim();
        if query.is_empty() {
            return ArticleResults {
                articles: Vec::new(),
                source: DataSource::Api,
            };
        }

        let result = self
            .call(Request::SearchArticles(ArticleQuery {
                query: query.to_string(),
                limit: Some(ARTICLE_LIMIT),
            }))
            .await;

        match result {
            Ok(response) => {
                let source = if response.demo {
                    DataSource::Demo
                } else {
                    DataSource::Api
                };
                ArticleResults {
                    articles: response.article_list().map(<[Article]>::to_vec).unwrap_or_default(),
                    source,
                }
            }
            Err(e) => {
                warn!(query, error = %e, "Article search failed, using demo articles");
                ArticleResults {
                    articles: demo::articles(query),
                    source: DataSource::Demo,
                }
            }
        }
    }

    pub async fn add_note(&self, text: &str) -> Result<NoteOutcome, PanelError> {
        if text.trim().is_empty() {
            return Err(PanelError::Validation("Please enter a note".to_string()));
        }
        let ticket_id = self.ticket_id()?.to_string();

        match self
            .call(Request::AddNote(NotePayload {
                ticket_id,
                note_text: text.to_string(),
            }))
            .await
        {
            Ok(_) => Ok(NoteOutcome::Added),
            Err(e) => {
                warn!(error = %e, "Add note failed, note saved locally");
                Ok(NoteOutcome::SavedLocally)
            }
        }
    }

    pub async fn update_status(&self, status: TicketStatus) -> StatusOutcome {
        let Some(ticket_id) = self.page.ticket_id.clone() else {
            warn!(%status, "No ticket open, status applied locally");
            return StatusOutcome::Local;
        };

        match self
            .call(Request::UpdateStatus(StatusChange { ticket_id, status }))
            .await
        {
            Ok(response) if !response.demo => StatusOutcome::Updated,
            Ok(_) => StatusOutcome::Local,
            Err(e) => {
                warn!(%status, error = %e, "Status update failed, applied locally");
                StatusOutcome::Local
            }
        }
    }
}

/// Ids the host UI uses for "none" are skipped.
fn usable(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.is_empty() && *id != "0")
}

fn history_view(tickets: Vec<Ticket>, current: Option<&str>, source: DataSource) -> HistoryView {
    let tickets = tickets
        .into_iter()
        .filter(|ticket| match (ticket.number, current) {
            (Some(number), Some(current)) => number.to_string() != current,
            _ => true,
        })
        .take(HISTORY_LIMIT as usize)
        .collect();
    HistoryView { tickets, source }
}
