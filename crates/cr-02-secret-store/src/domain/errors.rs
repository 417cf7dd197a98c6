//! # Domain Errors
//!
//! Error types for the Secret Store.

use shared_types::{CommitmentKey, StatusRegression};
use thiserror::Error;

/// Secret Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The shared backend failed or is unreachable.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Local cache file could not be read or written.
    #[error("Local cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local cache file is corrupt.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A different secret is already recorded for this commitment.
    /// Records are append-only; conflicts are flagged, never merged.
    #[error("Conflicting secret already recorded for {0}")]
    Conflict(CommitmentKey),

    /// A status hint would move backwards.
    #[error(transparent)]
    StatusRegression(#[from] StatusRegression),
}

impl StoreError {
    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Backend(_) | StoreError::Io(_))
    }
}
