//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment (<NAME>__SECTION__KEY)
//!     → loader.rs (typed values, nested document)
//!     → config file (TOML) merged on top
//!     → ServiceConfig + user ConfigSections (serde)
//!     → validation.rs (semantic checks)
//!     → registered as providers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

use std::path::PathBuf;

use thiserror::Error;

use crate::error::BoxError;

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigSection, ConfigSource};
pub use schema::{DiagnosticsConfig, GrpcConfig, HttpConfig, LogConfig, ServiceConfig};
pub use validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("load {section}: {source}")]
    Deserialize {
        section: &'static str,
        #[source]
        source: toml::de::Error,
    },

    #[error("describe {section}: {source}")]
    Serialize {
        section: &'static str,
        #[source]
        source: toml::ser::Error,
    },

    #[error("post-load {section}: {source}")]
    PostLoad {
        section: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("--only and --except are mutually exclusive")]
    ExclusiveFilters,
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
