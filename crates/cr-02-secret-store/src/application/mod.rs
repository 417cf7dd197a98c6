//! # Application Layer
//!
//! The dual-copy Secret Store service.

pub mod store;

pub use store::{PutReceipt, SecretStore};
