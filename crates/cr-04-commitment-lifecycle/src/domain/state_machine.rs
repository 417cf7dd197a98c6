//! # Transition Table
//!
//! Pure guard logic shared by interactive actions and automation. Given the
//! poll phase and the commitment's inferred status, decide whether a
//! transition may be submitted.
//!
//! ```text
//! Committed ──reveal──▶ Revealed ──(resolve, poll-level)──▶ ResolvedWinner ──claim──▶ Claimed
//!                                                      └──▶ ResolvedLoser (terminal)
//! ```

use serde::{Deserialize, Serialize};
use shared_types::{LifecycleStatus, PollPhase};
use std::fmt;

/// A write that moves a commitment (or its poll) forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    /// `Committed -> Revealed`, only inside the reveal window.
    Reveal,
    /// Poll-level: executes resolution once the reveal window closed.
    Resolve,
    /// `ResolvedWinner -> Claimed`.
    Claim,
}

impl Transition {
    /// Name used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reveal => "reveal",
            Self::Resolve => "resolve",
            Self::Claim => "claim",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Submit the write.
    Proceed,
    /// Target already reached; submit nothing.
    AlreadyDone,
    /// Too early; retry later.
    NotYetEligible(&'static str),
    /// Can never succeed.
    Refused(&'static str),
}

/// Commitment status a confirmed transition lands in. `None` for `Resolve`,
/// whose commitment-level effect is read, not written.
pub fn target_status(transition: Transition) -> Option<LifecycleStatus> {
    match transition {
        Transition::Reveal => Some(LifecycleStatus::Revealed),
        Transition::Resolve => None,
        Transition::Claim => Some(LifecycleStatus::Claimed),
    }
}

/// Decide whether `transition` may be submitted.
///
/// `status` is the commitment's inferred status; it is ignored for
/// `Resolve` and `None` means inference had no answer.
pub fn authorize(
    transition: Transition,
    phase: PollPhase,
    status: Option<LifecycleStatus>,
) -> Verdict {
    use LifecycleStatus::*;

    match transition {
        Transition::Resolve => match phase {
            PollPhase::Resolved => Verdict::AlreadyDone,
            PollPhase::AwaitingResolution => Verdict::Proceed,
            PollPhase::Commit | PollPhase::Reveal => {
                Verdict::NotYetEligible("reveal window still open")
            }
        },
        Transition::Reveal => match (status, phase) {
            (None, _) => Verdict::NotYetEligible("status unknown"),
            (Some(Revealed | ResolvedWinner | Claimed), _) => Verdict::AlreadyDone,
            (Some(ResolvedLoser), _) => Verdict::Refused("poll resolved"),
            (Some(_), PollPhase::Commit) => Verdict::NotYetEligible("reveal window not open"),
            (Some(Committed), PollPhase::Reveal) => Verdict::Proceed,
            (Some(_), _) => Verdict::Refused("reveal window closed"),
        },
        Transition::Claim => match (status, phase) {
            (None, _) => Verdict::NotYetEligible("status unknown"),
            (Some(Claimed), _) => Verdict::AlreadyDone,
            (Some(_), phase) if phase != PollPhase::Resolved => {
                Verdict::NotYetEligible("poll not resolved")
            }
            (Some(ResolvedWinner), _) => Verdict::Proceed,
            (Some(ResolvedLoser), _) => Verdict::Refused("commitment did not win"),
            (Some(_), _) => Verdict::NotYetEligible("resolution not observed"),
        },
    }
}
