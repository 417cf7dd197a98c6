//! # Domain Entities
//!
//! The two physical copies of a secret and the reports produced by merging
//! them.

use serde::{Deserialize, Serialize};
use shared_types::{
    Address, CommitmentKey, Hash, LifecycleStatus, PollId, Salt, Secret, StatusRegression,
    Timestamp,
};

/// Local (device) copy of a secret plus advisory progress flags.
///
/// Flags are hints only and must always be reconcilable against the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// The secret itself.
    pub secret: Secret,
    /// When this copy was first written.
    pub created_at: Timestamp,
    /// Whether the backend is known to hold the same secret.
    pub synced: bool,
    /// Confirmed revealed.
    pub revealed: bool,
    /// Confirmed claimed.
    pub claimed: bool,
    /// Last conclusively inferred status.
    pub status_hint: Option<LifecycleStatus>,
    /// Secret does not hash-match the ledger commitment. Kept, never dropped.
    pub invalid: bool,
    /// The ledger refused a write for this commitment for good. Automation
    /// leaves it alone.
    #[serde(default)]
    pub refused: bool,
    /// A different local secret displaced by the backend copy on conflict.
    #[serde(default)]
    pub displaced: Option<Secret>,
}

impl SecretRecord {
    /// Fresh local record, not yet synced.
    pub fn new(secret: Secret, created_at: Timestamp) -> Self {
        Self {
            secret,
            created_at,
            synced: false,
            revealed: false,
            claimed: false,
            status_hint: None,
            invalid: false,
            refused: false,
            displaced: None,
        }
    }

    /// Record pulled from the backend.
    pub fn from_backend(vote: &VoteRecord) -> Self {
        Self {
            synced: true,
            ..Self::new(vote.to_secret(), vote.recorded_at)
        }
    }

    /// Commitment key.
    pub fn key(&self) -> CommitmentKey {
        self.secret.key
    }

    /// Apply a status observation, refusing regressions.
    pub fn observe(&mut self, status: LifecycleStatus) -> Result<(), StatusRegression> {
        if let Some(previous) = self.status_hint {
            previous.check_successor(status)?;
        }
        self.status_hint = Some(status);
        // A loser may never have revealed; only these statuses prove a reveal.
        if matches!(
            status,
            LifecycleStatus::Revealed | LifecycleStatus::ResolvedWinner | LifecycleStatus::Claimed
        ) {
            self.revealed = true;
        }
        if status == LifecycleStatus::Claimed {
            self.claimed = true;
        }
        Ok(())
    }

    /// Whether automation still has a reveal to do.
    pub fn needs_reveal(&self) -> bool {
        !self.revealed
            && !self.invalid
            && !self.refused
            && !self.status_hint.map_or(false, |s| s.is_terminal())
    }

    /// Whether automation may still have a claim to do.
    pub fn needs_claim(&self) -> bool {
        !self.claimed
            && !self.invalid
            && !self.refused
            && self.status_hint != Some(LifecycleStatus::ResolvedLoser)
    }
}

/// Backend copy: one recorded vote, the commitment plus its secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Commitment key.
    pub key: CommitmentKey,
    /// Hash committed on the ledger.
    pub committed_hash: Hash,
    /// Chosen option.
    pub option: u32,
    /// Salt.
    pub salt: Salt,
    /// When the backend recorded it.
    pub recorded_at: Timestamp,
}

impl VoteRecord {
    /// Backend record for `secret`.
    pub fn from_secret(secret: &Secret, recorded_at: Timestamp) -> Self {
        Self {
            key: secret.key,
            committed_hash: secret.commitment_hash(),
            option: secret.option,
            salt: secret.salt,
            recorded_at,
        }
    }

    /// The secret carried by this record.
    pub fn to_secret(&self) -> Secret {
        Secret {
            key: self.key,
            option: self.option,
            salt: self.salt,
        }
    }

    /// Same commitment and same content, timestamps aside.
    pub fn same_content(&self, other: &VoteRecord) -> bool {
        self.key == other.key
            && self.committed_hash == other.committed_hash
            && self.option == other.option
            && self.salt == other.salt
    }
}

/// A secret written locally before its commit transaction was confirmed.
/// The ledger assigns the index, so the key is not known yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommit {
    /// Target poll.
    pub poll_id: PollId,
    /// Committing voter.
    pub voter: Address,
    /// Hash submitted to the ledger.
    pub committed_hash: Hash,
    /// Chosen option.
    pub option: u32,
    /// Salt.
    pub salt: Salt,
    /// When it was staged.
    pub staged_at: Timestamp,
}

impl PendingCommit {
    /// Promote to a secret once the ledger assigned `index`.
    pub fn into_secret(self, index: u32) -> Secret {
        Secret {
            key: CommitmentKey::new(self.poll_id, self.voter, index),
            option: self.option,
            salt: self.salt,
        }
    }
}

/// Filter for `list_polls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFilter {
    /// Every mirrored poll.
    All,
    /// Polls not yet resolved.
    Unresolved,
    /// Polls whose reveal window contains `now`.
    Revealable(Timestamp),
}

/// The same commitment carries different secrets locally and in the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretConflict {
    /// Commitment.
    pub key: CommitmentKey,
    /// Backend copy (kept).
    pub backend: Secret,
    /// Local copy (displaced, reported).
    pub local: Secret,
}

/// Result of merging the local and backend copies for one voter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Backend-only secrets copied into the local cache.
    pub pulled: Vec<CommitmentKey>,
    /// Local-only secrets written to the backend.
    pub pushed: Vec<CommitmentKey>,
    /// Local-only secrets older than the grace window (pushed, and flagged).
    pub stale_unsynced: Vec<CommitmentKey>,
    /// Local-only secrets the backend refused or failed to take.
    pub push_failures: Vec<CommitmentKey>,
    /// Conflicting content for the same commitment.
    pub conflicts: Vec<SecretConflict>,
}

impl ReconcileReport {
    /// True if both copies already agreed.
    pub fn is_clean(&self) -> bool {
        self.pulled.is_empty()
            && self.pushed.is_empty()
            && self.stale_unsynced.is_empty()
            && self.push_failures.is_empty()
            && self.conflicts.is_empty()
    }
}
