//! Ticket page detection.
//!
//! Classification is URL-based: the configured ticket pattern anywhere in the URL, or the
//! host marker as a fallback. Everything scraped from the page is best-effort and absence
//! means "unknown".

use super::dom::{first_text_matching, Document};
use crate::config::{split_selectors, PageConfig};
use crate::error::ConfigError;
use crate::model::PageInfo;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome of waiting for the host application's conversation view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostUiState {
    Ready,
    /// Deadline passed without a match; callers continue anyway.
    TimedOut,
}

pub struct PageDetector {
    document: Arc<dyn Document>,
    ticket_pattern: Regex,
    host_marker: String,
    email_selectors: Vec<String>,
    subject_selectors: Vec<String>,
    reply_selectors: Vec<String>,
    view_selectors: Vec<String>,
    poll_interval: Duration,
    timeout: Duration,
}

impl PageDetector {
    pub fn new(document: Arc<dyn Document>, config: &PageConfig) -> Result<Self, ConfigError> {
        let ticket_pattern = Regex::new(&config.ticket_url_pattern).map_err(|e| {
            ConfigError::Invalid(format!(
                "page.ticket_url_pattern '{}': {}",
                config.ticket_url_pattern, e
            ))
        })?;

        Ok(Self {
            document,
            ticket_pattern,
            host_marker: config.ticket_host_marker.clone(),
            email_selectors: split_selectors(&config.selectors.customer_email),
            subject_selectors: split_selectors(&config.selectors.ticket_subject),
            reply_selectors: split_selectors(&config.selectors.reply_textarea),
            view_selectors: split_selectors(&config.selectors.conversation_view),
            poll_interval: config.host_ui_poll_interval().max(Duration::from_millis(1)),
            timeout: config.host_ui_timeout(),
        })
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    /// Classify `url` without touching the page: `(is_ticket_page, ticket_id)`.
    pub fn classify(&self, url: &str) -> (bool, Option<String>) {
        if let Some(captures) = self.ticket_pattern.captures(url) {
            let ticket_id = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().to_string());
            return (true, ticket_id);
        }
        (url.contains(&self.host_marker), None)
    }

    pub fn detect(&self) -> PageInfo {
        let url = self.document.href();
        let (is_ticket_page, ticket_id) = self.classify(&url);

        if !is_ticket_page {
            debug!(url = %url, "Not a ticket page");
            return PageInfo::not_ticket(url);
        }

        let customer_email = self.customer_email();
        debug!(
            url = %url,
            ticket_id = ticket_id.as_deref().unwrap_or("-"),
            has_email = customer_email.is_some(),
            "Ticket page detected"
        );

        PageInfo {
            is_ticket_page,
            ticket_id,
            customer_email,
            url,
        }
    }

    /// First selector match whose text looks like an address.
    pub fn customer_email(&self) -> Option<String> {
        first_text_matching(self.document.as_ref(), &self.email_selectors, |text| {
            text.contains('@')
        })
    }

    pub fn ticket_subject(&self) -> Option<String> {
        first_text_matching(self.document.as_ref(), &self.subject_selectors, |text| {
            !text.is_empty()
        })
    }

    pub fn reply_draft(&self) -> Option<String> {
        self.reply_selectors
            .iter()
            .find_map(|selector| self.document.query_text(selector))
    }

    fn host_ui_present(&self) -> bool {
        self.view_selectors
            .iter()
            .any(|selector| self.document.exists(selector))
    }

    /// Poll for the conversation view until it appears or the deadline passes.
    pub async fn wait_for_host_ui(&self) -> HostUiState {
        let deadline = Instant::now() + self.timeout;
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            ticker.tick().await;
            if self.host_ui_present() {
                debug!("Host UI ready");
                return HostUiState::Ready;
            }
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Host UI did not appear, continuing anyway"
                );
                return HostUiState::TimedOut;
            }
        }
    }
}
