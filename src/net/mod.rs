//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (parse, bind, log bound address)
//!     → handed to the HTTP or gRPC facility, which serves it in a task
//! ```
//!
//! # Design Decisions
//! - Binding is part of the bootstrap; serving happens in the background
//! - Port 0 is allowed and the chosen port becomes a provider

pub mod listener;

pub use listener::{Listener, ListenerError};
