//! GrooveMate CLI Binary
//!
//! Command-line access to the background context: detection, dispatch, credentials.

use clap::Parser;
use groovemate::cli::{map_error, Cli, RunContext};
use groovemate::config::ConfigLoader;
use groovemate::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("GrooveMate CLI starting");

    let context = match RunContext::new(cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e.into()));
            process::exit(1);
        }
    };

    match context.execute(&cli.command).await {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = ConfigLoader::load(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.format = format;
    }

    config
}
