//! Crate-level error type.
//!
//! Every synchronous bootstrap failure surfaces as an [`Error`], attributed to
//! the phase or facility that produced it. Asynchronous failures from
//! background tasks travel on the exit signal as [`ServeError`] instead.

use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::exit::ServeError;
use crate::lifecycle::phase::Phase;
use crate::net::listener::ListenerError;
use crate::observability::logging::LoggingError;

/// Boxed error returned by failing callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort the bootstrap.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded, validated, or is contradictory.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The logger factory failed.
    #[error("init log error: {0}")]
    Logging(#[from] LoggingError),

    /// A subcommand or a command line preaction failed.
    #[error("cli error: {0}")]
    Cli(#[source] BoxError),

    /// A callback returned a failure.
    #[error("{phase} error in {name}: {source}")]
    Callback {
        phase: Phase,
        name: String,
        #[source]
        source: BoxError,
    },

    /// A network facility could not bind its listener.
    #[error("{facility} start error: {source}")]
    Listener {
        facility: &'static str,
        #[source]
        source: ListenerError,
    },

    /// The diagnostics endpoint could not be built.
    #[error("diagnostics start error: {0}")]
    Diagnostics(#[from] metrics_exporter_prometheus::BuildError),

    /// A background task terminated (only returned by `Service::run`).
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
