//! Module selection.
//!
//! A module is the name shared by the callbacks of one component. Command line
//! flags and default-disabled components decide which modules run.

pub mod filter;

pub use filter::{ModuleFilter, Selection};
