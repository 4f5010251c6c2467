//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! LogConfig
//!     → logging.rs (global subscriber, root Logger)
//!     → Logger::named per callback / facility
//!
//! DiagnosticsConfig
//!     → metrics.rs (Prometheus exporter in the background)
//!     → bootstrap counters and histograms
//! ```
//!
//! # Design Decisions
//! - Structured logging through `tracing`, every event tagged with its logger
//! - Metrics are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::Logger;
