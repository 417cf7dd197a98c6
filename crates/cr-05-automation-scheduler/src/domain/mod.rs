//! # Domain Module
//!
//! Tick lease, reports and errors of the scheduler.

pub mod errors;
pub mod lease;
pub mod report;

pub use errors::*;
pub use lease::*;
pub use report::*;
