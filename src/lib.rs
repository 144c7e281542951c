//! GrooveMate: agent-assist core for the Groove helpdesk
//!
//! Cross-context request/response messaging, the page detection and panel lifecycle, and
//! the background dispatcher that fronts the Groove ticketing and Groq generation APIs.

pub mod cli;
pub mod config;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod page;
pub mod panel;
pub mod prompt;
pub mod protocol;
pub mod quality;
pub mod storage;
pub mod transport;
