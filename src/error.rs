//! Error types for the GrooveMate core.
//!
//! One enum per layer. Only the Dispatcher and the panel client turn these into
//! user-facing strings; everything below them propagates with `?`.

use std::time::Duration;
use thiserror::Error;

/// Persistent key/value storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Stored value for '{key}' is not valid UTF-8")]
    InvalidValue { key: String },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Errors raised by the ticketing and generation gateways
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0} API key not configured. Please add it in settings.")]
    NotConfigured(&'static str),

    #[error("{service} API error: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} request failed: {message}")]
    Http {
        service: &'static str,
        message: String,
    },

    #[error("Failed to parse {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("Empty response from {0} API")]
    EmptyResponse(&'static str),

    #[error("Invalid {service} request: {message}")]
    InvalidRequest {
        service: &'static str,
        message: String,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Failures observed on one side of a cross-context call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The receiving context no longer exists.
    #[error("Extension context invalidated")]
    ContextInvalidated,

    /// The receiver accepted the call but dropped it without replying.
    #[error("The message port closed before a response was received")]
    Closed,

    #[error("Receiving context failed: {0}")]
    Receiver(String),
}

/// Terminal outcome of a `Transport::send`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Extension context invalidated after {attempts} attempts")]
    ContextInvalidated { attempts: u32 },

    #[error("The message port closed before a response was received")]
    Closed,

    #[error("Receiving context failed: {0}")]
    Receiver(String),

    #[error("No response received within {0:?}")]
    Timeout(Duration),
}

/// Host page (DOM) errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("Failed to create element '{0}'")]
    CreateFailed(String),
}

/// Errors that end one attempt of a lifecycle cycle
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Page error: {0}")]
    Dom(#[from] DomError),

    #[error("Channel error: {0}")]
    Transport(#[from] TransportError),

    #[error("Background rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("Panel render failed: {0}")]
    Render(String),
}

/// Errors surfaced to the agent by the panel client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("{0}")]
    Validation(String),

    #[error("{operation} failed: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("Channel error: {0}")]
    Transport(#[from] TransportError),

    #[error("Unexpected response to {0}")]
    UnexpectedResponse(&'static str),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(String),

    #[error("Configuration validation failed:\n{0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}
