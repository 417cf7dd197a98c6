//! # Domain Module
//!
//! Calls, receipts and errors of the ledger boundary.

pub mod calls;
pub mod errors;

pub use calls::*;
pub use errors::*;
