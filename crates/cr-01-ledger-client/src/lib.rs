//! # CR-01 Ledger Client
//!
//! Typed boundary over the authoritative poll contract.
//!
//! **Subsystem ID:** 01  
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Purpose
//!
//! Everything the engine knows about polls and commitments comes through this
//! crate:
//! - Reads: poll, commitment, revealed probe (optional), claimed probe,
//!   subscription expiry
//! - Dry runs: `simulate` never changes state
//! - Writes: submitted, then confirmed within a bounded wait
//!
//! ## Write Outcomes
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Confirmed` | Applied; safe to update caches |
//! | `Rejected` | Ledger refused; ambiguous, may mean "already done" |
//! | `Unknown` | Transport failure or timeout; never assumed failed |
//!
//! ## Module Structure
//!
//! ```text
//! cr-01-ledger-client/
//! ├── domain/          # LedgerCall, TxReceipt, WriteOutcome, LedgerError
//! ├── ports/           # LedgerClient trait
//! ├── application/     # TransactionExecutor, SignerLocks
//! ├── adapters/        # InMemoryLedger
//! └── config.rs        # LedgerClientConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{InMemoryLedger, GENERIC_REVERT};
pub use application::{SignerLocks, TransactionExecutor};
pub use config::LedgerClientConfig;
pub use domain::{
    CallKind, LedgerCall, LedgerError, LedgerEvent, SimulationOutcome, TxHandle, TxReceipt,
    TxStatus, WriteOutcome,
};
pub use ports::LedgerClient;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
