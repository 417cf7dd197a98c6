//! Successful action results.

use serde::{Deserialize, Serialize};
use shared_types::{CommitmentKey, Hash, LifecycleStatus};

/// A lifecycle action that ended well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// A write was confirmed by the ledger.
    Executed {
        /// Confirmed transaction.
        tx_hash: Hash,
        /// Commitment status after the write (`None` for poll-level actions).
        status: Option<LifecycleStatus>,
    },
    /// The target state had already been reached; nothing was submitted, or
    /// the ledger's rejection was explained by inference.
    AlreadyDone {
        /// Inferred status (`None` for poll-level actions).
        status: Option<LifecycleStatus>,
    },
}

impl ActionOutcome {
    /// Whether this call caused a confirmed write.
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }

    /// Label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Executed { .. } => "executed",
            Self::AlreadyDone { .. } => "already_done",
        }
    }
}

/// Result of a confirmed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Confirmed transaction.
    pub tx_hash: Hash,
    /// Hash recorded on the ledger.
    pub committed_hash: Hash,
    /// Ledger-assigned key. `None` if the receipt carried no index; the
    /// secret then stays staged until reconciliation matches it.
    pub key: Option<CommitmentKey>,
    /// Whether the secret reached the shared backend.
    pub backend_synced: bool,
}
