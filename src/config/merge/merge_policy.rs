//! Merge rules: defaults first, every later source overrides key by key.

use crate::config::GrooveMateConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder seeded with the built-in defaults.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&GrooveMateConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
