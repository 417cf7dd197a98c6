//! # Adapters
//!
//! Ledger port implementations.

pub mod in_memory;

pub use in_memory::{InMemoryLedger, DEFAULT_SUBSCRIPTION_PERIOD_SECS, GENERIC_REVERT};
