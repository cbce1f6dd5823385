mod cli;
pub mod serde_helpers;
mod validation;

use crate::domain::{DEFAULT_API_HOST, EndpointMap};
use crate::sender::ClientConfig;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_helpers::{
    load_env_list, load_env_string, load_env_string_opt, load_env_var, load_env_var_opt,
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use cli::Cli;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Missing project token. Set MIXPANEL_TOKEN or pass --token")]
    MissingToken,
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error(transparent)]
    Args(#[from] clap::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("unknown log level '{s}'")),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format '{s}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mixpanel project token
    pub token: Option<String>,
    pub api_host: String,
    /// API secret, required by the import endpoint
    pub api_key: Option<String>,
    /// Per-endpoint buffer threshold; unset means one request per record
    pub buffer_size: Option<usize>,
    pub timeout_secs: u64,
    pub connection_timeout_secs: u64,
    pub max_connections: usize,
    pub user_agent: String,
    pub enable_compression: bool,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    /// Extra `target=level` filter entries
    pub log_directives: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            api_host: DEFAULT_API_HOST.to_string(),
            api_key: None,
            buffer_size: None,
            timeout_secs: 10,
            connection_timeout_secs: 5,
            max_connections: 10,
            user_agent: format!("mixpanel-sender/{}", env!("CARGO_PKG_VERSION")),
            enable_compression: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            log_directives: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without validating it; later layers may still
    /// replace invalid values.
    pub(crate) fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Defaults overridden by `MIXPANEL_*`, `LOG_LEVEL`, `LOG_FORMAT` and
    /// `LOG_DIRECTIVES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn apply_env(&mut self) -> Result<(), ConfigError> {
        load_env_string_opt("MIXPANEL_TOKEN", &mut self.token);
        load_env_string("MIXPANEL_API_HOST", &mut self.api_host);
        load_env_string_opt("MIXPANEL_API_KEY", &mut self.api_key);
        load_env_var_opt("MIXPANEL_BUFFER_SIZE", &mut self.buffer_size)?;
        load_env_var("MIXPANEL_TIMEOUT_SECS", &mut self.timeout_secs)?;
        load_env_var("MIXPANEL_CONNECTION_TIMEOUT_SECS", &mut self.connection_timeout_secs)?;
        load_env_var("MIXPANEL_MAX_CONNECTIONS", &mut self.max_connections)?;
        load_env_var("MIXPANEL_ENABLE_COMPRESSION", &mut self.enable_compression)?;
        load_env_var("LOG_LEVEL", &mut self.log_level)?;
        load_env_var("LOG_FORMAT", &mut self.log_format)?;
        load_env_list("LOG_DIRECTIVES", &mut self.log_directives);
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connection_timeout: Duration::from_secs(self.connection_timeout_secs),
            max_connections: self.max_connections,
            user_agent: self.user_agent.clone(),
            enable_compression: self.enable_compression,
            ..ClientConfig::default()
        }
    }

    pub fn endpoint_map(&self) -> Result<EndpointMap, ConfigError> {
        let host = self.api_host_url()?;
        Ok(EndpointMap::mixpanel(&host, self.api_key.as_deref()))
    }

    pub fn api_host_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_host).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid API host '{}': {}", self.api_host, e))
        })
    }

    /// The configured token, or [`ConfigError::MissingToken`].
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        match self.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ConfigError::MissingToken),
        }
    }
}
