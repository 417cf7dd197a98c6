//! # Domain Module
//!
//! Transition table, action outcomes and the error taxonomy.

pub mod errors;
pub mod outcome;
pub mod state_machine;

pub use errors::*;
pub use outcome::*;
pub use state_machine::*;
