//! # Application Layer

pub mod engine;

pub use engine::InferenceEngine;
