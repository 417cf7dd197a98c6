//! # CR-04 Commitment Lifecycle
//!
//! Legal transitions of a commitment and the side effects of each, shared by
//! interactive actions and the automation scheduler.
//!
//! **Subsystem ID:** 04  
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## States
//!
//! ```text
//! Committed → Revealed → {AwaitingResolution →} ResolvedWinner | ResolvedLoser → Claimed
//! ```
//!
//! `ResolvedLoser` and `Claimed` are terminal.
//!
//! ## Exactly-Once in Effect
//!
//! The ledger answers "already done" with a generic revert. Each write is
//! therefore preceded by inference (so a finished action submits nothing)
//! and each rejection is followed by inference (so a lost race reads as
//! `AlreadyDone`, not as a failure).
//!
//! ## Module Structure
//!
//! ```text
//! cr-04-commitment-lifecycle/
//! ├── domain/          # Transition table, ActionOutcome, ActionError
//! └── application/     # LifecycleService
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod domain;

// Re-exports
pub use application::LifecycleService;
pub use domain::{
    authorize, target_status, ActionError, ActionOutcome, CommitReceipt, Transition, Verdict,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
