//! # Reports
//!
//! What a tick or an attach did. Failures are itemized per target so that
//! one failing commitment never hides the outcome of the others.

use cr_02_secret_store::ReconcileReport;
use cr_04_commitment_lifecycle::{ActionError, ActionOutcome, Transition};
use shared_types::{CommitmentKey, Hash, LifecycleStatus, PollId};
use std::fmt;

/// What an automated write was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A whole poll (resolution).
    Poll(PollId),
    /// One commitment (reveal, claim).
    Commitment(CommitmentKey),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Poll(id) => write!(f, "poll={}", id),
            Target::Commitment(key) => write!(f, "{}", key),
        }
    }
}

/// One automated write attempt.
#[derive(Debug, Clone)]
pub struct ItemResult {
    /// Transition attempted.
    pub transition: Transition,
    /// Target.
    pub target: Target,
    /// Outcome.
    pub result: Result<ActionOutcome, ActionError>,
}

/// Summary of one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Tick sequence number, starting at 1.
    pub tick: u64,
    /// Polls enumerated.
    pub polls_scanned: u64,
    /// Polls whose state could not be read this tick.
    pub poll_failures: Vec<(PollId, String)>,
    /// Every write attempted, in order.
    pub items: Vec<ItemResult>,
    /// Voters reconciled this tick.
    pub reconciled: usize,
}

impl TickReport {
    pub(crate) fn push(
        &mut self,
        transition: Transition,
        target: Target,
        result: Result<ActionOutcome, ActionError>,
    ) {
        self.items.push(ItemResult {
            transition,
            target,
            result,
        });
    }

    /// Writes submitted and confirmed.
    pub fn executed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(&item.result, Ok(outcome) if outcome.is_executed()))
            .count()
    }

    /// Targets found already done; nothing was submitted for them.
    pub fn already_done(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.result, Ok(ActionOutcome::AlreadyDone { .. })))
            .count()
    }

    /// Failed attempts.
    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.items.iter().filter(|item| item.result.is_err())
    }

    /// Outcome recorded for `target`, if it was attempted.
    pub fn outcome_for(&self, target: &Target) -> Option<&Result<ActionOutcome, ActionError>> {
        self.items
            .iter()
            .find(|item| item.target == *target)
            .map(|item| &item.result)
    }
}

/// Summary of running the reconciliation routine for one voter.
#[derive(Debug, Clone, Default)]
pub struct AttachReport {
    /// Secret merge result; `None` if the backend could not be reached.
    pub secrets: Option<ReconcileReport>,
    /// Staged commits matched to a ledger commitment and promoted.
    pub recovered: Vec<CommitmentKey>,
    /// Staged commits that never landed and can no longer land.
    pub abandoned: Vec<Hash>,
    /// Status hints that moved: `(key, before, after)`.
    pub repaired: Vec<(CommitmentKey, Option<LifecycleStatus>, LifecycleStatus)>,
    /// Commitments whose status could not be determined.
    pub inconclusive: Vec<CommitmentKey>,
}
