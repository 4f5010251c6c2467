//! HTTP facility.
//!
//! # Data Flow
//! ```text
//! Start callbacks
//!     → server.rs HttpServer (route / merge / nest)
//!     → build_app (access log, CORS)
//!     → bound listener, served by axum until shutdown
//!     → exit signal
//! ```

pub mod server;

pub use server::{HttpAddr, HttpServer};
