//! # Error Types
//!
//! Errors shared across crates.

use thiserror::Error;

use crate::status::LifecycleStatus;

/// An observed status would move a commitment backwards (or sideways between
/// winner and loser). Always a bug in the observer, never a ledger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Status regression rejected: {from} -> {to}")]
pub struct StatusRegression {
    /// Previously observed status.
    pub from: LifecycleStatus,
    /// Rejected new status.
    pub to: LifecycleStatus,
}
