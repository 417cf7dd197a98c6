//! # CR-03 Status Inference
//!
//! True lifecycle status of a commitment, derived only from ledger
//! observations.
//!
//! **Subsystem ID:** 03  
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Purpose
//!
//! The ledger answers "already done" and "invalid" with the same opaque
//! revert, and some contract versions have no revealed probe at all. Every
//! write in the engine is preceded by an inference here, and every ambiguous
//! write outcome is followed by one.
//!
//! ## Evidence
//!
//! | Evidence | Conclusive |
//! |----------|------------|
//! | `PhaseWindow` | yes |
//! | `DirectRead` | yes |
//! | `Resolution` | yes |
//! | `SpeculativeProbe` | no, logged and counted separately |
//!
//! ## Module Structure
//!
//! ```text
//! cr-03-status-inference/
//! ├── domain/          # StatusInference, Evidence, UnknownReason
//! └── application/     # InferenceEngine
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod domain;

// Re-exports
pub use application::InferenceEngine;
pub use domain::{Evidence, StatusInference, UnknownReason};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
