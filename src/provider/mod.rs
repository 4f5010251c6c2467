//! Type-directed provider registry.
//!
//! # Data Flow
//! ```text
//! explicit providers, configs, logger
//!     → registry.rs (ordered append-only store)
//!     → extract.rs (callback arguments resolved by type)
//!     → callback outputs appended back into the registry
//! ```
//!
//! # Design Decisions
//! - First registered value wins; later values never shadow earlier ones
//! - Unresolved inputs are not errors, they fall back to a default value
//! - Interface-shaped lookups go through explicitly declared capability views

pub mod extract;
pub mod registry;

pub use extract::{Dep, FromProviders, Scope};
pub use registry::{Provider, Providers};
