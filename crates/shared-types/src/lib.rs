//! # Shared Types Crate
//!
//! Domain entities used across the reconciliation engine.
//!
//! ## Design Principles
//!
//! - **Ledger owns truth**: `Poll` and `Commitment` mirror ledger state and are
//!   never treated as authoritative when a cache disagrees with the ledger.
//! - **Derived phase**: a poll's phase is recomputed from timestamps on every
//!   call, never stored.
//! - **Monotonic status**: `LifecycleStatus` may only advance; regressions are
//!   rejected at the type level via [`LifecycleStatus::check_successor`].

pub mod entities;
pub mod errors;
pub mod hashing;
pub mod status;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use hashing::{commitment_hash, keccak256};
pub use status::LifecycleStatus;
pub use time::{MockTimeSource, SystemTimeSource, TimeSource};
