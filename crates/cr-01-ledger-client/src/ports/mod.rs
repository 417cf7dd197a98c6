//! # Ports Module
//!
//! The ledger port consumed by inference, lifecycle and automation.

pub mod ledger;

pub use ledger::*;
