//! # Lifecycle Status
//!
//! Derived status of a commitment. Recomputed from ledger observations and
//! cached only as a hint.
//!
//! ```text
//! Committed ──→ Revealed ──→ AwaitingResolution ──┬──→ ResolvedWinner ──→ Claimed
//!                                                 └──→ ResolvedLoser (terminal)
//! ```
//!
//! Statuses form a partial order. Intermediate steps may be skipped (an
//! observer can see `Committed` and next `ResolvedWinner`) but never walked
//! backwards, and `ResolvedWinner`/`ResolvedLoser` never swap.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::StatusRegression;

/// Lifecycle status of one commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStatus {
    /// Committed, not yet revealed.
    Committed,
    /// Revealed on the ledger.
    Revealed,
    /// Reveal window closed, poll not yet resolved.
    AwaitingResolution,
    /// Resolved, commitment picked the winning option, reward unclaimed.
    ResolvedWinner,
    /// Resolved, commitment lost. Terminal.
    ResolvedLoser,
    /// Reward claimed. Terminal.
    Claimed,
}

impl LifecycleStatus {
    /// Position in the partial order. Winner and loser share a rank.
    pub fn rank(self) -> u8 {
        match self {
            Self::Committed => 0,
            Self::Revealed => 1,
            Self::AwaitingResolution => 2,
            Self::ResolvedWinner | Self::ResolvedLoser => 3,
            Self::Claimed => 4,
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ResolvedLoser | Self::Claimed)
    }

    /// True once the poll outcome is known for this commitment.
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            Self::ResolvedWinner | Self::ResolvedLoser | Self::Claimed
        )
    }

    /// True if `self` is at or beyond `target` along a legal path.
    pub fn has_reached(self, target: LifecycleStatus) -> bool {
        self == target || target.can_advance_to(self).is_ok()
    }

    /// Whether `next` is a legal forward move from `self` (equality excluded).
    pub fn can_advance_to(self, next: LifecycleStatus) -> Result<(), StatusRegression> {
        let legal = match self {
            Self::ResolvedLoser | Self::Claimed => false,
            Self::ResolvedWinner => next == Self::Claimed,
            _ => next.rank() > self.rank(),
        };
        if legal {
            Ok(())
        } else {
            Err(StatusRegression {
                from: self,
                to: next,
            })
        }
    }

    /// Accept `next` as the successor of `self`: equal or a legal advance.
    pub fn check_successor(self, next: LifecycleStatus) -> Result<(), StatusRegression> {
        if self == next {
            return Ok(());
        }
        self.can_advance_to(next)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Committed => "committed",
            Self::Revealed => "revealed",
            Self::AwaitingResolution => "awaiting_resolution",
            Self::ResolvedWinner => "resolved_winner",
            Self::ResolvedLoser => "resolved_loser",
            Self::Claimed => "claimed",
        };
        f.write_str(name)
    }
}
