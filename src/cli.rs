//! CLI domain: parse, route and output only.
//! Route table dispatches to the background context services.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, CredentialCommands};
pub use route::RunContext;
