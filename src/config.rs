//! Configuration System
//!
//! Layered configuration for every context: built-in defaults, the global config file,
//! an optional explicit file, then `GROOVEMATE_*` environment variables. Durations are
//! expressed in milliseconds in files and exposed as [`Duration`] accessors.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrooveMateConfig {
    #[serde(default)]
    pub endpoints: EndpointConfig,

    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub page: PageConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_groq_chat_url")]
    pub groq_chat_url: String,

    #[serde(default = "default_groove_base_url")]
    pub groove_base_url: String,

    /// Connect timeout for both gateways
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout for both gateways
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_groq_chat_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_groove_base_url() -> String {
    "https://api.groovehq.com/v1".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            groq_chat_url: default_groq_chat_url(),
            groove_base_url: default_groove_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl EndpointConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Generation models by speed tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_fast_model")]
    pub fast: String,
    #[serde(default = "default_balanced_model")]
    pub balanced: String,
}

fn default_fast_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_balanced_model() -> String {
    "llama-3.1-70b-versatile".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_model(),
            balanced: default_balanced_model(),
        }
    }
}

/// Sampling options sent with every completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// Cross-context call policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Attempts made while the receiving context reports itself invalidated
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound on the wait for a reply; 0 disables the bound
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_response_timeout_ms() -> u64 {
    30_000
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

impl TransportConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        (self.response_timeout_ms > 0).then(|| Duration::from_millis(self.response_timeout_ms))
    }
}

/// Host page selectors and panel geometry
///
/// Selector lists are comma-separated and tried in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_sidebar_id")]
    pub sidebar_id: String,

    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: String,

    #[serde(default = "default_host_ui_poll_ms")]
    pub host_ui_poll_ms: u64,

    #[serde(default = "default_host_ui_timeout_ms")]
    pub host_ui_timeout_ms: u64,

    /// Regex with one capture group for the ticket number
    #[serde(default = "default_ticket_url_pattern")]
    pub ticket_url_pattern: String,

    /// Plain substring that marks a ticket page even without a number
    #[serde(default = "default_ticket_host_marker")]
    pub ticket_host_marker: String,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

fn default_sidebar_id() -> String {
    "groovemate-sidebar".to_string()
}

fn default_sidebar_width() -> String {
    "400px".to_string()
}

fn default_host_ui_poll_ms() -> u64 {
    500
}

fn default_host_ui_timeout_ms() -> u64 {
    10_000
}

fn default_ticket_url_pattern() -> String {
    r"/tickets/(\d+)".to_string()
}

fn default_ticket_host_marker() -> String {
    "groovehq.com/tickets/".to_string()
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            sidebar_id: default_sidebar_id(),
            sidebar_width: default_sidebar_width(),
            host_ui_poll_ms: default_host_ui_poll_ms(),
            host_ui_timeout_ms: default_host_ui_timeout_ms(),
            ticket_url_pattern: default_ticket_url_pattern(),
            ticket_host_marker: default_ticket_host_marker(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl PageConfig {
    pub fn host_ui_poll_interval(&self) -> Duration {
        Duration::from_millis(self.host_ui_poll_ms)
    }

    pub fn host_ui_timeout(&self) -> Duration {
        Duration::from_millis(self.host_ui_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_customer_email")]
    pub customer_email: String,
    #[serde(default = "default_ticket_subject")]
    pub ticket_subject: String,
    #[serde(default = "default_ticket_body")]
    pub ticket_body: String,
    #[serde(default = "default_reply_textarea")]
    pub reply_textarea: String,
    #[serde(default = "default_main_content")]
    pub main_content: String,
    #[serde(default = "default_conversation_view")]
    pub conversation_view: String,
}

fn default_customer_email() -> String {
    ".customer-email, [data-customer-email], .contact-email".to_string()
}

fn default_ticket_subject() -> String {
    ".conversation-subject, h1.subject, .ticket-subject".to_string()
}

fn default_ticket_body() -> String {
    ".message-body, .conversation-message .body, [data-testid=\"message-body\"]".to_string()
}

fn default_reply_textarea() -> String {
    "textarea[name=\"body\"], .conversation-reply textarea, [data-testid=\"reply-textarea\"]"
        .to_string()
}

fn default_main_content() -> String {
    ".main-content, .conversation-container, .app-main".to_string()
}

fn default_conversation_view() -> String {
    ".conversation-view, .ticket-details, .conversation-messages".to_string()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            customer_email: default_customer_email(),
            ticket_subject: default_ticket_subject(),
            ticket_body: default_ticket_body(),
            reply_textarea: default_reply_textarea(),
            main_content: default_main_content(),
            conversation_view: default_conversation_view(),
        }
    }
}

/// Split a comma-separated selector list into trimmed, non-empty selectors.
pub fn split_selectors(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Page lifecycle timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_lifecycle_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_lifecycle_delay_ms")]
    pub navigation_debounce_ms: u64,

    #[serde(default = "default_location_poll_ms")]
    pub location_poll_ms: u64,
}

fn default_lifecycle_delay_ms() -> u64 {
    1_000
}

fn default_location_poll_ms() -> u64 {
    500
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_attempts(),
            retry_delay_ms: default_lifecycle_delay_ms(),
            navigation_debounce_ms: default_lifecycle_delay_ms(),
            location_poll_ms: default_location_poll_ms(),
        }
    }
}

impl LifecycleConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn navigation_debounce(&self) -> Duration {
        Duration::from_millis(self.navigation_debounce_ms)
    }

    pub fn location_poll_interval(&self) -> Duration {
        Duration::from_millis(self.location_poll_ms)
    }
}

/// Persistent storage location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        directories::ProjectDirs::from("com", "groovemate", "groovemate")
            .map(|dirs| dirs.data_dir().join("store"))
            .ok_or_else(|| {
                ConfigError::Load("Could not determine a data directory for storage".to_string())
            })
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Endpoint(String),
    Transport(String),
    Page(String),
    Lifecycle(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Endpoint(msg) => write!(f, "Endpoints: {}", msg),
            ValidationError::Transport(msg) => write!(f, "Transport: {}", msg),
            ValidationError::Page(msg) => write!(f, "Page: {}", msg),
            ValidationError::Lifecycle(msg) => write!(f, "Lifecycle: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl GrooveMateConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !is_http_url(&self.endpoints.groq_chat_url) {
            errors.push(ValidationError::Endpoint(format!(
                "groq_chat_url must be an http(s) URL, got '{}'",
                self.endpoints.groq_chat_url
            )));
        }
        if !is_http_url(&self.endpoints.groove_base_url) {
            errors.push(ValidationError::Endpoint(format!(
                "groove_base_url must be an http(s) URL, got '{}'",
                self.endpoints.groove_base_url
            )));
        }

        if self.transport.max_attempts == 0 {
            errors.push(ValidationError::Transport(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        match regex::Regex::new(&self.page.ticket_url_pattern) {
            Ok(re) if re.captures_len() < 2 => errors.push(ValidationError::Page(
                "ticket_url_pattern needs a capture group for the ticket number".to_string(),
            )),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::Page(format!(
                "ticket_url_pattern is not a valid regex: {}",
                e
            ))),
        }
        if self.page.sidebar_id.trim().is_empty() {
            errors.push(ValidationError::Page("sidebar_id cannot be empty".to_string()));
        }
        if self.page.host_ui_poll_ms == 0 {
            errors.push(ValidationError::Page(
                "host_ui_poll_ms must be greater than zero".to_string(),
            ));
        }

        if self.lifecycle.max_attempts == 0 {
            errors.push(ValidationError::Lifecycle(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.lifecycle.location_poll_ms == 0 {
            errors.push(ValidationError::Lifecycle(
                "location_poll_ms must be greater than zero".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into one [`ConfigError`]
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ConfigError::Invalid(msgs.join("\n"))
        })?;
        Ok(self)
    }
}

/// Loads [`GrooveMateConfig`] from all sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults → global file → `explicit` file (if any) → environment.
    pub fn load(explicit: Option<&Path>) -> Result<GrooveMateConfig, ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = match explicit {
            Some(path) => sources::explicit_file::add_to_builder(builder, path)?,
            None => builder,
        };
        let builder = sources::environment::add_to_builder(builder);

        let config: GrooveMateConfig = builder.build()?.try_deserialize()?;
        config.validated()
    }

    /// Defaults overlaid by a single file, ignoring global file and environment.
    pub fn load_from_file(path: &Path) -> Result<GrooveMateConfig, ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::explicit_file::add_to_builder(builder, path)?;
        let config: GrooveMateConfig = builder.build()?.try_deserialize()?;
        config.validated()
    }
}
