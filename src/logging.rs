//! Structured logging.
//!
//! [`LoggingConfig`] comes from the configuration layers (and CLI flags); the
//! `GROOVEMATE_LOG*` environment variables are applied last by [`LogSettings::resolve`].
//! Only the binary installs a subscriber; library code just emits `tracing` events.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const ENV_FILTER: &str = "GROOVEMATE_LOG";
const ENV_FORMAT: &str = "GROOVEMATE_LOG_FORMAT";
const ENV_OUTPUT: &str = "GROOVEMATE_LOG_OUTPUT";
const ENV_MODULES: &str = "GROOVEMATE_LOG_MODULES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("invalid log format '{}' (expected text or json)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            other => Err(format!(
                "invalid log output '{}' (expected stdout, stderr or file)",
                other
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level: trace, debug, info, warn, error, off
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Destination when `output = "file"`; defaults to the platform data directory
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// ANSI colors for text output on a terminal stream
    #[serde(default = "default_color")]
    pub color: bool,

    /// Per-target levels, e.g. `groovemate::transport = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file: None,
            color: default_color(),
            modules: BTreeMap::new(),
        }
    }
}

/// Effective logging setup after environment overrides
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// `EnvFilter` directive string
    pub filter: String,
    pub format: LogFormat,
    pub output: LogOutput,
    pub file: PathBuf,
    pub color: bool,
}

fn default_log_file() -> PathBuf {
    directories::ProjectDirs::from("com", "groovemate", "groovemate")
        .map(|dirs| dirs.data_dir().join("groovemate.log"))
        .unwrap_or_else(|| PathBuf::from("groovemate.log"))
}

fn parse_module_list(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .filter_map(|entry| entry.split_once('='))
        .map(|(target, level)| (target.trim().to_string(), level.trim().to_string()))
        .filter(|(target, level)| !target.is_empty() && !level.is_empty())
        .collect()
}

impl LogSettings {
    /// Apply `GROOVEMATE_LOG*` overrides from the process environment.
    pub fn resolve(config: &LoggingConfig) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Like [`LogSettings::resolve`], reading variables through `env`.
    pub fn resolve_with<F>(config: &LoggingConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let filter = match env(ENV_FILTER).filter(|v| !v.trim().is_empty()) {
            Some(directives) => directives,
            None => {
                let mut modules: BTreeMap<String, String> = config.modules.clone();
                if let Some(list) = env(ENV_MODULES) {
                    modules.extend(parse_module_list(&list));
                }
                if config.level == "off" {
                    "off".to_string()
                } else {
                    std::iter::once(config.level.clone())
                        .chain(modules.iter().map(|(target, level)| format!("{}={}", target, level)))
                        .collect::<Vec<_>>()
                        .join(",")
                }
            }
        };

        let format = match env(ENV_FORMAT) {
            Some(value) => value.parse().map_err(ConfigError::Load)?,
            None => config.format,
        };
        let output = match env(ENV_OUTPUT) {
            Some(value) => value.parse().map_err(ConfigError::Load)?,
            None => config.output,
        };

        Ok(Self {
            filter,
            format,
            output,
            file: config.file.clone().unwrap_or_else(default_log_file),
            color: config.color && output != LogOutput::File,
        })
    }

    fn writer(&self) -> Result<BoxMakeWriter, ConfigError> {
        Ok(match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => {
                if let Some(parent) = self.file.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ConfigError::Load(format!("Failed to create log directory: {}", e))
                    })?;
                }
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.file)
                    .map_err(|e| {
                        ConfigError::Load(format!(
                            "Failed to open log file {}: {}",
                            self.file.display(),
                            e
                        ))
                    })?;
                BoxMakeWriter::new(std::sync::Mutex::new(file))
            }
        })
    }
}

/// Install the global subscriber described by `config` plus environment overrides.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let settings = LogSettings::resolve(config)?;
    let filter = EnvFilter::try_new(&settings.filter)
        .map_err(|e| ConfigError::Load(format!("Invalid log filter '{}': {}", settings.filter, e)))?;
    let writer = settings.writer()?;
    let registry = Registry::default().with(filter);

    let installed = match settings.format {
        LogFormat::Json => registry
            .with(
                layer_fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                layer_fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(settings.color)
                    .with_writer(writer),
            )
            .try_init(),
    };
    installed.map_err(|e| ConfigError::Load(format!("Failed to install logger: {}", e)))
}
