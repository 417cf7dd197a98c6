//! # Application Layer
//!
//! Write execution on top of the ledger port.

pub mod executor;

pub use executor::{SignerLocks, TransactionExecutor};
