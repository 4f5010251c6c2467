//! Service bootstrap runtime.
//!
//! Builds a long-running network service out of named callbacks. Each
//! callback declares what it needs by argument type and what it offers by
//! return type; the runtime resolves arguments from a registry of providers,
//! runs the callbacks phase by phase, starts the HTTP and gRPC listeners, and
//! reports background failures on an exit signal.
//!
//! ```no_run
//! use std::sync::Arc;
//! use service_bootstrap::{Dep, HttpServer, Service};
//!
//! #[derive(Default)]
//! struct Db;
//!
//! # async fn run() -> Result<(), service_bootstrap::Error> {
//! let running = Service::builder()
//!     .name("inventory")
//!     .http(true)
//!     .init("db", || async { Arc::new(Db) })
//!     .start("api", |Dep(http): Dep<HttpServer>, Dep(_db): Dep<Arc<Db>>| async move {
//!         http.route("/health", axum::routing::get(|| async { "ok" }));
//!     })
//!     .build()
//!     .start()
//!     .await?;
//! running.wait().await?;
//! # Ok(())
//! # }
//! ```

// Core
pub mod error;
pub mod lifecycle;
pub mod module;
pub mod provider;

// Collaborators
pub mod cli;
pub mod config;
pub mod observability;

// Network facilities
pub mod grpc;
pub mod http;
pub mod net;

pub use cli::{Flags, Version};
pub use config::{ConfigSection, ServiceConfig};
pub use error::{BoxError, Error, Result};
pub use grpc::{GrpcAddr, GrpcOptions, GrpcServer};
pub use http::{HttpAddr, HttpServer};
pub use lifecycle::{
    Component, ExitReporter, Output, Phase, Running, ServeError, Service, ServiceBuilder, Shutdown,
};
pub use module::Selection;
pub use observability::Logger;
pub use provider::{Dep, Provider, Providers};
