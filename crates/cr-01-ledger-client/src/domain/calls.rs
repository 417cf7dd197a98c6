//! # Ledger Calls and Receipts
//!
//! State-changing calls, the handles returned on submission and the receipts
//! obtained once a handle is confirmed.

use serde::{Deserialize, Serialize};
use shared_types::{Address, CommitmentKey, Hash, PollId, Salt, Timestamp};
use std::fmt;

/// A state-changing ledger call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCall {
    /// Commit a hidden vote. The signer is the voter.
    Commit {
        /// Target poll.
        poll_id: PollId,
        /// `commitment_hash(option, salt)`.
        hash: Hash,
    },
    /// Open a commitment. May be signed by the voter or an authorized operator.
    Reveal {
        /// Commitment being opened.
        key: CommitmentKey,
        /// Committed option.
        option: u32,
        /// Committed salt.
        salt: Salt,
    },
    /// Execute resolution. Callable by anyone once the reveal window closed.
    Resolve {
        /// Target poll.
        poll_id: PollId,
    },
    /// Claim the reward of a winning commitment.
    Claim {
        /// Winning commitment.
        key: CommitmentKey,
    },
    /// Buy or extend automation entitlement for the signer.
    Subscribe {
        /// Number of subscription periods purchased.
        periods: u32,
    },
}

impl LedgerCall {
    /// Kind label of this call.
    pub fn kind(&self) -> CallKind {
        match self {
            Self::Commit { .. } => CallKind::Commit,
            Self::Reveal { .. } => CallKind::Reveal,
            Self::Resolve { .. } => CallKind::Resolve,
            Self::Claim { .. } => CallKind::Claim,
            Self::Subscribe { .. } => CallKind::Subscribe,
        }
    }

    /// Poll targeted by the call, if any.
    pub fn poll_id(&self) -> Option<PollId> {
        match self {
            Self::Commit { poll_id, .. } | Self::Resolve { poll_id } => Some(*poll_id),
            Self::Reveal { key, .. } | Self::Claim { key } => Some(key.poll_id),
            Self::Subscribe { .. } => None,
        }
    }

    /// Voter the call acts for. `None` for calls acting only for the signer.
    pub fn subject(&self) -> Option<Address> {
        match self {
            Self::Reveal { key, .. } | Self::Claim { key } => Some(key.voter),
            _ => None,
        }
    }
}

/// Kind of a ledger call, used as a log and metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    /// `commit`
    Commit,
    /// `reveal`
    Reveal,
    /// `resolve`
    Resolve,
    /// `claim`
    Claim,
    /// `subscribe`
    Subscribe,
}

impl CallKind {
    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Reveal => "reveal",
            Self::Resolve => "resolve",
            Self::Claim => "claim",
            Self::Subscribe => "subscribe",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle of a submitted transaction. Not truth until confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Call kind.
    pub kind: CallKind,
    /// Signing identity.
    pub signer: Address,
}

/// Events emitted by confirmed calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A commitment was recorded at a ledger-assigned index.
    CommitRecorded {
        /// Key including the assigned index.
        key: CommitmentKey,
        /// Recorded hash.
        hash: Hash,
    },
    /// A commitment was opened.
    Revealed {
        /// Opened commitment.
        key: CommitmentKey,
        /// Revealed option.
        option: u32,
    },
    /// A poll was resolved.
    Resolved {
        /// Resolved poll.
        poll_id: PollId,
        /// Winning option.
        winning_option: u32,
    },
    /// A reward was claimed.
    Claimed {
        /// Claimed commitment.
        key: CommitmentKey,
    },
    /// A subscription was created or extended.
    Subscribed {
        /// Subscriber.
        voter: Address,
        /// New expiry.
        expiry: Timestamp,
    },
}

/// Final status of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Applied.
    Confirmed,
    /// Reverted by the contract with an opaque reason.
    Reverted {
        /// Revert reason.
        reason: String,
    },
}

/// Receipt for a transaction that reached finality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Final status.
    pub status: TxStatus,
    /// Events (empty when reverted).
    pub events: Vec<LedgerEvent>,
}

impl TxReceipt {
    /// Whether the transaction was applied.
    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, TxStatus::Confirmed)
    }

    /// Index assigned by a `CommitRecorded` event, if present.
    pub fn assigned_index(&self) -> Option<u32> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::CommitRecorded { key, .. } => Some(key.index),
            _ => None,
        })
    }
}

/// Outcome of a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationOutcome {
    /// The call would be applied if submitted now.
    WouldSucceed,
    /// The call would revert.
    WouldRevert {
        /// Revert reason.
        reason: String,
    },
}

/// Result of submitting a write and waiting (bounded) for its confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Confirmed and applied.
    Confirmed(TxReceipt),
    /// Confirmed as reverted, or refused at submission.
    Rejected {
        /// Hash if the transaction was broadcast.
        tx_hash: Option<Hash>,
        /// Opaque revert reason.
        reason: String,
    },
    /// Submission or confirmation failed in transport. The write may or may
    /// not have been applied; it must never be assumed failed.
    Unknown {
        /// Hash if the transaction was broadcast.
        tx_hash: Option<Hash>,
        /// What went wrong.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CommitmentKey {
        CommitmentKey::new(4, [7u8; 20], 1)
    }

    #[test]
    fn test_call_kind_and_subject() {
        let call = LedgerCall::Claim { key: key() };
        assert_eq!(call.kind(), CallKind::Claim);
        assert_eq!(call.poll_id(), Some(4));
        assert_eq!(call.subject(), Some([7u8; 20]));

        let sub = LedgerCall::Subscribe { periods: 2 };
        assert_eq!(sub.poll_id(), None);
        assert_eq!(sub.subject(), None);
    }

    #[test]
    fn test_assigned_index_from_receipt() {
        let receipt = TxReceipt {
            tx_hash: [1u8; 32],
            status: TxStatus::Confirmed,
            events: vec![LedgerEvent::CommitRecorded {
                key: key(),
                hash: [2u8; 32],
            }],
        };
        assert!(receipt.is_confirmed());
        assert_eq!(receipt.assigned_index(), Some(1));
    }

    #[test]
    fn test_reverted_receipt_has_no_index() {
        let receipt = TxReceipt {
            tx_hash: [1u8; 32],
            status: TxStatus::Reverted {
                reason: "execution reverted".into(),
            },
            events: vec![],
        };
        assert!(!receipt.is_confirmed());
        assert_eq!(receipt.assigned_index(), None);
    }
}
