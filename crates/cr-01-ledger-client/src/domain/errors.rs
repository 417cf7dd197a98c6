//! # Domain Errors
//!
//! Error types for ledger calls. The split that matters downstream is
//! "the ledger answered" versus "the call failed": only the former may ever
//! feed status inference.

use shared_types::PollId;
use thiserror::Error;

/// Ledger call error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Network failure talking to the ledger endpoint.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No answer within the bounded wait.
    #[error("Timed out after {waited_ms}ms")]
    Timeout {
        /// How long the caller waited.
        waited_ms: u64,
    },

    /// Endpoint throttled the caller.
    #[error("Rate limited by ledger endpoint")]
    RateLimited,

    /// Poll id beyond the ledger's poll count.
    #[error("Poll not found: {0}")]
    PollNotFound(PollId),

    /// Transaction hash the ledger has never seen.
    #[error("Unknown transaction: 0x{0}")]
    UnknownTransaction(String),

    /// The ledger refused the call. The reason is opaque and may mean
    /// "already done" as easily as "invalid".
    #[error("Execution reverted: {reason}")]
    Reverted {
        /// Revert reason as reported.
        reason: String,
    },
}

impl LedgerError {
    /// True when the call failed before the ledger gave an answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::RateLimited
        )
    }
}
