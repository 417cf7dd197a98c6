//! # Application Layer
//!
//! `LifecycleService` orchestrates infer, authorize, submit and re-infer.

pub mod service;

pub use service::LifecycleService;
