//! # Ports Module
//!
//! The two physical copies behind the Secret Store.

pub mod outbound;

pub use outbound::*;
