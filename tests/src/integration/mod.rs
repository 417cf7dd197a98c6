//! Cross-subsystem integration tests.

pub mod automation;
pub mod properties;
pub mod scenarios;
