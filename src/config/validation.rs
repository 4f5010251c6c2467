//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check listen addresses of enabled facilities
//! - Check the log filter and CORS settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before any callback sees the configuration

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a loaded service configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = EnvFilter::try_new(&config.log.level) {
        errors.push(ValidationError::new("log.level", e.to_string()));
    }

    let listeners = [
        ("http.address", config.http.enabled, &config.http.address),
        ("grpc.address", config.grpc.enabled, &config.grpc.address),
        (
            "diagnostics.address",
            config.diagnostics.enabled,
            &config.diagnostics.address,
        ),
    ];
    for (field, enabled, address) in listeners {
        if enabled && address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                field,
                format!("{address:?} is not a socket address"),
            ));
        }
    }

    if config.http.cors {
        for origin in &config.http.cors_allowed_origins {
            if origin == "*" {
                if config.http.cors_allow_credentials {
                    errors.push(ValidationError::new(
                        "http.cors_allowed_origins",
                        "wildcard origin cannot be combined with credentials",
                    ));
                }
            } else if HeaderValue::from_str(origin).is_err() {
                errors.push(ValidationError::new(
                    "http.cors_allowed_origins",
                    format!("{origin:?} is not a valid origin"),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.http.address = "localhost".to_string();
        config.grpc.address = "nope".to_string();
        config.http.cors = true;
        config.http.cors_allow_credentials = true;
        config.http.cors_allowed_origins = vec!["*".to_string()];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["http.address", "grpc.address", "http.cors_allowed_origins"]
        );
    }

    #[test]
    fn test_disabled_listener_is_not_checked() {
        let mut config = ServiceConfig::default();
        config.grpc.enabled = false;
        config.grpc.address = String::new();

        assert!(validate_config(&config).is_ok());
    }
}
