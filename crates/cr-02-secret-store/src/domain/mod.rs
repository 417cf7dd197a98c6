//! # Domain Module
//!
//! Records, reports and errors of the Secret Store.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
