use super::config::{LogFormat, LogLevel};
use parking_lot::RwLock;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Invalid directive '{input}': {reason}")]
    InvalidDirective { input: String, reason: String },

    #[error("Logging system initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A `target=level` filter entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(directive: &str) -> Result<Self, InitializationError> {
        let invalid = |reason: &str| InitializationError::InvalidDirective {
            input: directive.to_string(),
            reason: reason.to_string(),
        };

        let Some((target, level)) = directive.split_once('=') else {
            return Err(invalid("expected 'target=level'"));
        };

        let target = target.trim();
        if target.is_empty() {
            return Err(invalid("empty target"));
        }

        let level = LogLevel::from_str(level.trim()).map_err(|e| invalid(e.as_str()))?;
        Ok(Self::new(target, level))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

/// Collects filter directives and installs the global tracing subscriber.
pub struct LoggingSystem {
    directives: RwLock<Vec<LogDirective>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
        }
    }

    pub fn add_directive(&self, directive: &str) -> Result<(), InitializationError> {
        let directive = LogDirective::parse(directive)?;
        self.directives.write().push(directive);
        Ok(())
    }

    /// Quiets the HTTP stack below the application's own level.
    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        for target in ["hyper", "reqwest", "h2", "rustls"] {
            directives.push(LogDirective::new(target, LogLevel::Warn));
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut parts = Vec::with_capacity(directives.len() + 1);
        parts.push(default_level.as_str().to_string());
        parts.extend(directives.iter().map(LogDirective::to_filter_string));
        parts.join(",")
    }

    /// Installs a stderr subscriber. `RUST_LOG`, when set, replaces the
    /// built filter.
    pub fn initialize_tracing(
        &self,
        default_level: LogLevel,
        format: LogFormat,
    ) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);

        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&filter_string).map_err(|e| {
                InitializationError::LoggingInitFailed {
                    details: format!("Failed to create EnvFilter with '{filter_string}'"),
                    source: Box::new(e),
                }
            })?,
        };

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = match format {
            LogFormat::Json => tracing::subscriber::set_global_default(
                registry.with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                ),
            ),
            LogFormat::Text => tracing::subscriber::set_global_default(
                registry.with(
                    fmt::layer()
                        .compact()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                ),
            ),
        };

        result.map_err(|e| InitializationError::LoggingInitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets up logging for the binary. A second call returns an error.
///
/// Malformed entries in `directives` are reported on stderr and skipped.
pub fn setup_logging(
    level: LogLevel,
    format: LogFormat,
    directives: &[String],
) -> Result<(), InitializationError> {
    let logging_system = LoggingSystem::new();
    logging_system.add_default_directives();
    for directive in directives {
        if let Err(e) = logging_system.add_directive(directive) {
            eprintln!("Warning: {e}, skipping directive");
        }
    }
    logging_system.initialize_tracing(level, format)
}
