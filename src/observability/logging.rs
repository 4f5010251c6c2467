//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber from the log configuration
//! - Hand out named, hierarchical loggers (`svc`, `svc.db`, `svc.grpc`)
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - JSON output for production, plain text otherwise
//! - An already-installed subscriber is kept (embedding, tests)

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::LogConfig;

/// Error raised by the logger factory.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}

/// A named logger handle.
///
/// Names form a dot-separated hierarchy; every event carries the name in its
/// `logger` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    name: Arc<str>,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
        }
    }

    /// Derive a child logger, `parent.child`.
    pub fn named(&self, child: &str) -> Self {
        Self::new(format!("{}.{}", self.name, child))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Span used to attribute everything a callback does to this logger.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("callback", logger = %self.name)
    }

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!(logger = %self.name, "{}", message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(logger = %self.name, "{}", message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(logger = %self.name, "{}", message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(logger = %self.name, "{}", message);
    }
}

impl fmt::Display for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Build the filter from `RUST_LOG`, or from the configured level.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level).map_err(|source| LoggingError::Filter {
        directive: config.level.clone(),
        source,
    })
}

/// Install the global subscriber and return the root logger for `name`.
pub fn init(name: &str, config: &LogConfig) -> Result<Logger, LoggingError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if installed.is_err() {
        tracing::debug!("global subscriber already installed, keeping it");
    }

    Ok(Logger::new(name))
}
