//! # CR-05 Automation Scheduler
//!
//! Reveals, resolves and claims on behalf of subscribed voters, and
//! reconciles local state against the backend and the ledger.
//!
//! **Subsystem ID:** 05  
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Tick Guarantees
//!
//! - Single flight: a tick that finds the lease held is skipped, not queued
//! - Failure isolation: one failing commitment never blocks the rest
//! - Idempotence: reached targets are skipped without submitting anything
//! - Pacing: writes within a tick are spaced by the inter-call delay
//!
//! ## Module Structure
//!
//! ```text
//! cr-05-automation-scheduler/
//! ├── domain/          # TickLease, TickReport, AttachReport, SchedulerError
//! ├── application/     # AutomationScheduler, ReconciliationRoutine
//! └── config.rs        # SchedulerConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod domain;

// Re-exports
pub use application::{AutomationScheduler, ReconciliationRoutine};
pub use config::SchedulerConfig;
pub use domain::{
    AttachReport, ItemResult, SchedulerError, Target, TickGuard, TickLease, TickReport,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
