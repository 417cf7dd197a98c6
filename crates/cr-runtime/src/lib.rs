//! # Engine Runtime Library
//!
//! Wiring for the reconciliation engine. The entry point is the `main.rs`
//! binary; the container is exposed here for tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;

// Re-exports
pub use container::{ConfigError, EngineContainer, RuntimeConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
