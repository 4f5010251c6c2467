//! gRPC facility.
//!
//! # Data Flow
//! ```text
//! Init callbacks   → GrpcOptions (timeouts, limits, keepalive)
//! Start callbacks  → GrpcServer::add_service
//! ListenersLive    → tonic server on the bound listener, until shutdown
//!                  → exit signal
//! ```

pub mod server;

pub use server::{GrpcAddr, GrpcOptions, GrpcServer, GrpcSettings};
