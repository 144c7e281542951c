//! CLI parse: clap types for GrooveMate. No behavior; definitions only.

use crate::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GrooveMate CLI - run the background context headlessly
#[derive(Parser)]
#[command(name = "groovemate")]
#[command(about = "Agent-assist core for the Groove helpdesk")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a URL the way the page context does
    Detect {
        /// Page URL
        url: String,
    },
    /// Run one wire request through the background dispatcher
    Dispatch {
        /// Request JSON, e.g. {"type":"CHECK_QUALITY","payload":{"text":"..."}}; read from stdin when omitted
        request: Option<String>,
    },
    /// Manage stored API keys
    Credentials {
        #[command(subcommand)]
        command: CredentialCommands,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum CredentialCommands {
    /// Store one or both API keys
    Set {
        /// Groq API key
        #[arg(long)]
        groq_key: Option<String>,
        /// Groove API key
        #[arg(long)]
        groove_key: Option<String>,
    },
    /// Show stored keys (masked)
    Show,
    /// Remove both keys
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}
