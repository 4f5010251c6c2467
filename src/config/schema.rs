//! Configuration schema definitions.
//!
//! This module defines the service-level configuration every bootstrapped
//! service gets. All types derive Serde traits and default every field, so an
//! empty document is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for a bootstrapped service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logging settings.
    pub log: LogConfig,

    /// HTTP listener settings.
    pub http: HttpConfig,

    /// gRPC listener settings.
    pub grpc: GrpcConfig,

    /// Diagnostics (Prometheus) endpoint settings.
    pub diagnostics: DiagnosticsConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (e.g. "info", "debug,hyper=warn").
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Serve HTTP at all (the service must also opt in).
    pub enabled: bool,

    /// Bind address (e.g. "0.0.0.0:20000"; port 0 picks a free port).
    pub address: String,

    /// Wrap the router in a CORS layer.
    pub cors: bool,

    /// Allowed origins; empty means any.
    pub cors_allowed_origins: Vec<String>,

    /// Allow credentials on CORS requests.
    pub cors_allow_credentials: bool,

    /// Log access lines at info instead of debug.
    pub access_log_info: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0:20000".to_string(),
            cors: false,
            cors_allowed_origins: Vec::new(),
            cors_allow_credentials: false,
            access_log_info: false,
        }
    }
}

/// gRPC listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GrpcConfig {
    /// Serve gRPC at all (the service must also opt in).
    pub enabled: bool,

    /// Bind address (e.g. "0.0.0.0:20001").
    pub address: String,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0:20001".to_string(),
        }
    }
}

/// Diagnostics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Expose Prometheus metrics.
    pub enabled: bool,

    /// Bind address, loopback by default.
    pub address: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:20002".to_string(),
        }
    }
}
