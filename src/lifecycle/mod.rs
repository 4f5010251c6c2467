//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Logger → Init → Setup? → Start → Listeners → Ready
//!
//! Each callback (invoker.rs, callback.rs):
//!     Resolve inputs from providers → await → fold outputs into providers
//!
//! Exit (exit.rs):
//!     Background task stops → one report on the exit signal
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown → listeners report Ok
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then callbacks, then listeners
//! - Callbacks within and across phases run strictly sequentially
//! - No rollback: a failed callback aborts the bootstrap as is

pub mod callback;
pub mod exit;
pub mod invoker;
pub mod phase;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use callback::{Callback, Callbacks, Component, Handler, IntoOutputs, Output};
pub use exit::{ExitReporter, ExitSignal, ServeError};
pub use phase::{Phase, State};
pub use shutdown::Shutdown;
pub use startup::{Running, Service, ServiceBuilder};
