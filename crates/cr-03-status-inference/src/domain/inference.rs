//! # Inference Results
//!
//! A status is either known, with the evidence it rests on, or unknown with a
//! reason. Transport failures always land in `Unknown`.

use serde::{Deserialize, Serialize};
use shared_types::LifecycleStatus;
use thiserror::Error;

/// What a conclusion rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evidence {
    /// Poll phase alone (time versus phase ends).
    PhaseWindow,
    /// A direct ledger read (revealed or claimed probe).
    DirectRead,
    /// A dry run that reverted or would succeed. Heuristic: a revert is
    /// opaque and only hints that the action was already done.
    SpeculativeProbe,
    /// Resolved poll's winning option compared with the secret.
    Resolution,
}

impl Evidence {
    /// Whether this conclusion came from a heuristic.
    pub fn is_heuristic(self) -> bool {
        self == Evidence::SpeculativeProbe
    }
}

/// Why no status could be concluded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownReason {
    /// The ledger could not be reached. Never read as a status.
    #[error("ledger unreachable: {0}")]
    Transport(String),

    /// The ledger has no commitment at this key.
    #[error("no such commitment on the ledger")]
    NoSuchCommitment,

    /// Deciding needs the secret and none was given.
    #[error("secret required to decide")]
    SecretRequired,

    /// The secret does not open the ledger commitment.
    #[error("secret does not match the ledger commitment")]
    SecretMismatch,
}

/// Outcome of [`InferenceEngine::infer_status`](crate::InferenceEngine::infer_status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusInference {
    /// Status concluded.
    Known {
        /// The inferred status.
        status: LifecycleStatus,
        /// What it rests on.
        evidence: Evidence,
    },
    /// Nothing conclusive.
    Unknown {
        /// Why.
        reason: UnknownReason,
    },
}

impl StatusInference {
    pub(crate) fn known(status: LifecycleStatus, evidence: Evidence) -> Self {
        Self::Known { status, evidence }
    }

    pub(crate) fn unknown(reason: UnknownReason) -> Self {
        Self::Unknown { reason }
    }

    /// The status, if known.
    pub fn status(&self) -> Option<LifecycleStatus> {
        match self {
            Self::Known { status, .. } => Some(*status),
            Self::Unknown { .. } => None,
        }
    }

    /// True for a known status backed by non-heuristic evidence.
    pub fn is_conclusive(&self) -> bool {
        matches!(self, Self::Known { evidence, .. } if !evidence.is_heuristic())
    }

    /// True for a known status backed by a dry run.
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Self::Known { evidence, .. } if evidence.is_heuristic())
    }

    /// `Some(true)` if the known status has reached `target`, `None` if unknown.
    pub fn has_reached(&self, target: LifecycleStatus) -> Option<bool> {
        self.status().map(|status| status.has_reached(target))
    }
}
