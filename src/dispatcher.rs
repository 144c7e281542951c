//! Background dispatcher.
//!
//! Routes every [`Request`] to its handler and always answers with a [`Response`]
//! envelope. Handler errors become failure envelopes; optional capabilities degrade to
//! demo data instead of failing.

use crate::config::{GrooveMateConfig, ModelConfig};
use crate::demo;
use crate::error::GatewayError;
use crate::gateway::{
    CompletionOptions, GatewayFactory, GenerationGateway, TicketingGateway, GROOVE, GROQ,
};
use crate::model::PageInfo;
use crate::prompt;
use crate::protocol::{
    ArticleQuery, DecodeError, HistoryQuery, NotePayload, QualityCheckPayload, Request, Response,
    StatusChange, SuggestionPayload, TicketRef, UNKNOWN_OPERATION,
};
use crate::quality::QualityCheckResult;
use crate::storage::credentials::CredentialCache;
use crate::transport::{Inbound, Inbox};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const PAGE_DETECTED_REPLY: &str = "Page detected";
pub const NOTE_ADDED: &str = "Note added successfully";
pub const STATUS_UPDATED: &str = "Status updated successfully";
pub const STATUS_QUEUED: &str = "Status update queued locally";

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub models: ModelConfig,
    pub options: CompletionOptions,
    /// Used when a history query carries no limit.
    pub history_limit: u32,
    /// Used when an article query carries no limit.
    pub article_limit: u32,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self::from(&GrooveMateConfig::default())
    }
}

impl From<&GrooveMateConfig> for DispatcherSettings {
    fn from(config: &GrooveMateConfig) -> Self {
        Self {
            models: config.models.clone(),
            options: CompletionOptions::from(&config.generation),
            history_limit: 10,
            article_limit: 5,
        }
    }
}

pub struct Dispatcher {
    credentials: Arc<CredentialCache>,
    gateways: Arc<dyn GatewayFactory>,
    settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(
        credentials: Arc<CredentialCache>,
        gateways: Arc<dyn GatewayFactory>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            credentials,
            gateways,
            settings,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// Handle a raw wire message.
    pub async fn handle_value(&self, value: Value) -> Response {
        match Request::from_value(value) {
            Ok(request) => self.handle(request).await,
            Err(DecodeError::UnknownOperation(name)) => {
                warn!(operation = %name, "Unknown message type");
                Response::failure(UNKNOWN_OPERATION)
            }
            Err(e) => {
                warn!(error = %e, "Malformed message payload");
                Response::failure(e.to_string())
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        let kind = request.kind();
        debug!(%kind, "Handling message");

        let result = match request {
            Request::PageDetected(info) => Ok(self.page_detected(info)),
            Request::CheckQuality(payload) => self.check_quality(payload).await,
            Request::GenerateSuggestion(payload) => self.generate_suggestion(payload).await,
            Request::FetchTicketData(ticket) => self.fetch_ticket(ticket).await,
            Request::FetchCustomerHistory(query) => self.fetch_history(query).await,
            Request::AddNote(note) => self.add_note(note).await,
            Request::UpdateStatus(change) => Ok(self.update_status(change).await),
            Request::SearchArticles(query) => Ok(self.search_articles(query).await),
        };

        result.unwrap_or_else(|e| {
            error!(%kind, error = %e, "Handler failed");
            Response::failure(e.to_string())
        })
    }

    /// Answer calls from `inbox` until every sender is gone, one task per call.
    pub async fn serve(self: Arc<Self>, mut inbox: Inbox) {
        info!("Dispatcher listening");
        while let Some(inbound) = inbox.recv().await {
            let dispatcher = Arc::clone(&self);
            tokio::spawn(async move {
                let Inbound { request, responder } = inbound;
                let kind = request.kind();
                match AssertUnwindSafe(dispatcher.handle(request)).catch_unwind().await {
                    Ok(response) => {
                        if !responder.respond(response) {
                            debug!(%kind, "Caller stopped waiting for the response");
                        }
                    }
                    Err(_) => {
                        error!(%kind, "Handler panicked");
                        responder.reject(format!("{} handler panicked", kind));
                    }
                }
            });
        }
        info!("Dispatcher inbox closed");
    }

    fn generation(&self) -> Result<Arc<dyn GenerationGateway>, GatewayError> {
        let key = self
            .credentials
            .groq_api_key()
            .ok_or(GatewayError::NotConfigured(GROQ))?;
        self.gateways.generation(&key)
    }

    fn ticketing(&self) -> Result<Arc<dyn TicketingGateway>, GatewayError> {
        let key = self
            .credentials
            .groove_api_key()
            .ok_or(GatewayError::NotConfigured(GROOVE))?;
        self.gateways.ticketing(&key)
    }

    fn page_detected(&self, info: PageInfo) -> Response {
        if info.is_ticket_page {
            info!(
                ticket_id = info.ticket_id.as_deref().unwrap_or("-"),
                url = %info.url,
                "Ticket page confirmed"
            );
        } else {
            debug!(url = %info.url, "Page detected");
        }
        Response::message(PAGE_DETECTED_REPLY)
    }

    async fn check_quality(&self, payload: QualityCheckPayload) -> Result<Response, GatewayError> {
        let gateway = self.generation()?;
        let reply = gateway
            .chat_completion(
                &self.settings.models.fast,
                prompt::quality_check(&payload.text),
                self.settings.options.clone(),
            )
            .await?;

        let result = QualityCheckResult::parse_or_default(&reply);
        info!(score = result.score, "Quality check complete");
        Ok(Response::quality(result))
    }

    async fn generate_suggestion(&self, payload: SuggestionPayload) -> Result<Response, GatewayError> {
        let gateway = self.generation()?;
        let reply = gateway
            .chat_completion(
                &self.settings.models.balanced,
                prompt::suggestion(&payload),
                self.settings.options.clone(),
            )
            .await?;

        let suggestion = reply.trim();
        if suggestion.is_empty() {
            return Err(GatewayError::EmptyResponse(GROQ));
        }
        info!(chars = suggestion.len(), "Suggestion generated");
        Ok(Response::suggestion(suggestion))
    }

    async fn fetch_ticket(&self, ticket: TicketRef) -> Result<Response, GatewayError> {
        let ticket = self.ticketing()?.get_ticket(&ticket.ticket_id).await?;
        debug!(ticket_id = %ticket.id, messages = ticket.messages.len(), "Ticket fetched");
        Ok(Response::ticket(ticket))
    }

    async fn fetch_history(&self, query: HistoryQuery) -> Result<Response, GatewayError> {
        let limit = query.limit.unwrap_or(self.settings.history_limit);
        let tickets = self
            .ticketing()?
            .get_customer_tickets(&query.customer_id, limit)
            .await?;
        debug!(customer_id = %query.customer_id, count = tickets.len(), "Customer history fetched");
        Ok(Response::tickets(tickets))
    }

    async fn add_note(&self, note: NotePayload) -> Result<Response, GatewayError> {
        if note.note_text.trim().is_empty() {
            return Err(GatewayError::InvalidRequest {
                service: GROOVE,
                message: "note text is empty".to_string(),
            });
        }
        self.ticketing()?
            .add_note(&note.ticket_id, &note.note_text)
            .await?;
        info!(ticket_id = %note.ticket_id, "Note added");
        Ok(Response::message(NOTE_ADDED))
    }

    async fn update_status(&self, change: StatusChange) -> Response {
        let gateway = match self.ticketing() {
            Ok(gateway) => gateway,
            Err(e) => {
                warn!(ticket_id = %change.ticket_id, error = %e, "Status change not sent, using mock reply");
                return Response::message(STATUS_UPDATED).as_demo();
            }
        };

        match gateway.update_status(&change.ticket_id, change.status).await {
            Ok(()) => {
                info!(ticket_id = %change.ticket_id, status = %change.status, "Status updated");
                Response::message(STATUS_UPDATED)
            }
            Err(e) => {
                warn!(ticket_id = %change.ticket_id, error = %e, "Status update failed, queued locally");
                Response::message(STATUS_QUEUED).as_demo()
            }
        }
    }

    async fn search_articles(&self, query: ArticleQuery) -> Response {
        if query.query.trim().is_empty() {
            return Response::articles(Vec::new());
        }
        let limit = query.limit.unwrap_or(self.settings.article_limit);

        let result = match self.ticketing() {
            Ok(gateway) => gateway.search_articles(&query.query, limit).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(articles) => {
                debug!(query = %query.query, count = articles.len(), "Articles found");
                Response::articles(articles)
            }
            Err(e) => {
                warn!(query = %query.query, error = %e, "Article search unavailable, using demo articles");
                Response::articles(demo::articles(&query.query)).as_demo()
            }
        }
    }
}
