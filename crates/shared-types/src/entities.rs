//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Ledger-owned**: `Poll`, `Commitment`, `CommitmentKey`
//! - **Off-chain**: `Secret`, `Subscription`
//! - **Derived**: `PollPhase` (never stored)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hashing::commitment_hash;

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 32-byte salt blinding a committed option.
pub type Salt = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Ledger-assigned poll identifier. Ids are dense and monotonic from zero.
pub type PollId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Short hex rendering of an address for log fields.
pub fn short_address(address: &Address) -> String {
    format!("0x{}", hex::encode(&address[..4]))
}

// =============================================================================
// CLUSTER A: LEDGER-OWNED
// =============================================================================

/// A poll as mirrored from the ledger.
///
/// `winning_option` is only meaningful while `resolved` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    /// Ledger-assigned id (immutable).
    pub id: PollId,
    /// Question text.
    pub question: String,
    /// Options; the index is the option identity.
    pub options: Vec<String>,
    /// End of the commit window (exclusive).
    pub commit_phase_end: Timestamp,
    /// End of the reveal window (exclusive).
    pub reveal_phase_end: Timestamp,
    /// Whether anyone has executed resolution.
    pub resolved: bool,
    /// Winning option index, set on resolution.
    pub winning_option: Option<u32>,
}

/// Phase of a poll, recomputed from time and the resolved flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollPhase {
    /// `now < commit_phase_end`.
    Commit,
    /// `commit_phase_end <= now < reveal_phase_end`.
    Reveal,
    /// Reveal window closed, nobody resolved yet.
    AwaitingResolution,
    /// Resolution executed on the ledger.
    Resolved,
}

impl Poll {
    /// Compute the phase at `now`.
    pub fn phase(&self, now: Timestamp) -> PollPhase {
        if self.resolved {
            PollPhase::Resolved
        } else if now < self.commit_phase_end {
            PollPhase::Commit
        } else if now < self.reveal_phase_end {
            PollPhase::Reveal
        } else {
            PollPhase::AwaitingResolution
        }
    }

    /// True while `now` is inside `[commit_phase_end, reveal_phase_end)`.
    pub fn in_reveal_window(&self, now: Timestamp) -> bool {
        now >= self.commit_phase_end && now < self.reveal_phase_end
    }

    /// Winning option, only if resolved.
    pub fn winner(&self) -> Option<u32> {
        if self.resolved {
            self.winning_option
        } else {
            None
        }
    }

    /// Whether `option` names one of this poll's options.
    pub fn has_option(&self, option: u32) -> bool {
        (option as usize) < self.options.len()
    }
}

/// Unique identity of a commitment: `(poll_id, voter, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitmentKey {
    /// Poll the commitment belongs to.
    pub poll_id: PollId,
    /// Committing voter.
    pub voter: Address,
    /// Per-voter, per-poll sequence number assigned by the ledger.
    pub index: u32,
}

impl CommitmentKey {
    /// Create a key.
    pub fn new(poll_id: PollId, voter: Address, index: u32) -> Self {
        Self {
            poll_id,
            voter,
            index,
        }
    }
}

impl fmt::Display for CommitmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "poll={} voter={} idx={}",
            self.poll_id,
            short_address(&self.voter),
            self.index
        )
    }
}

/// A commitment as recorded on the ledger. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Identity.
    pub key: CommitmentKey,
    /// `commitment_hash(option, salt)` as submitted.
    pub committed_hash: Hash,
}

// =============================================================================
// CLUSTER B: OFF-CHAIN
// =============================================================================

/// The secret needed to reveal a commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    /// Commitment this secret opens.
    pub key: CommitmentKey,
    /// Chosen option index.
    pub option: u32,
    /// Blinding salt.
    pub salt: Salt,
}

impl Secret {
    /// Hash this secret would have been committed under.
    pub fn commitment_hash(&self) -> Hash {
        commitment_hash(self.option, &self.salt)
    }

    /// Whether this secret opens `commitment`.
    pub fn matches(&self, commitment: &Commitment) -> bool {
        self.key == commitment.key && self.commitment_hash() == commitment.committed_hash
    }
}

/// Automation entitlement for a voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Entitled voter.
    pub voter: Address,
    /// Expiry (exclusive). Zero means never subscribed.
    pub expiry: Timestamp,
}

impl Subscription {
    /// Active while `now < expiry`; expiry is passive.
    pub fn is_active(&self, now: Timestamp) -> bool {
        now < self.expiry
    }
}
