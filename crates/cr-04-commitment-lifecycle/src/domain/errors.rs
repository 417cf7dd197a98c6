//! # Domain Errors
//!
//! | Error | Retried | Shown to the acting party |
//! |-------|---------|---------------------------|
//! | `TransportFailure` | yes | no |
//! | `NotYetEligible` | yes | no |
//! | `Inconclusive` | yes | no |
//! | `Storage` | yes | no |
//! | `SecretMissing` | no | yes |
//! | `SecretInvalid` | no | yes |
//! | `GenuineRejection` | no | yes |
//!
//! "Already done" is not an error; see `ActionOutcome::AlreadyDone`.

use cr_01_ledger_client::LedgerError;
use cr_02_secret_store::StoreError;
use cr_03_status_inference::UnknownReason;
use shared_types::CommitmentKey;
use thiserror::Error;

/// Why a lifecycle action did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Network failure or timeout. Nothing is inferred from it.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// No secret stored for the commitment; the reveal is impossible.
    #[error("No secret stored for {0}")]
    SecretMissing(CommitmentKey),

    /// The stored secret does not open the ledger commitment.
    #[error("Stored secret does not match the ledger commitment for {0}")]
    SecretInvalid(CommitmentKey),

    /// Phase or timing guard failed; retry later.
    #[error("Not yet eligible: {0}")]
    NotYetEligible(String),

    /// Inference confirms the action cannot succeed.
    #[error("Rejected: {0}")]
    GenuineRejection(String),

    /// The ledger rejected the write and re-inference could not decide why.
    #[error("Outcome undecided: {0}")]
    Inconclusive(String),

    /// The Secret Store failed.
    #[error("Secret store failure: {0}")]
    Storage(String),
}

impl ActionError {
    /// Whether a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure(_)
                | Self::NotYetEligible(_)
                | Self::Inconclusive(_)
                | Self::Storage(_)
        )
    }

    /// Whether the acting party should see this error.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::SecretMissing(_) | Self::SecretInvalid(_) | Self::GenuineRejection(_)
        )
    }

    /// Map an inference gap for `key`.
    pub fn from_unknown(key: &CommitmentKey, reason: &UnknownReason) -> Self {
        match reason {
            UnknownReason::Transport(e) => Self::TransportFailure(e.clone()),
            UnknownReason::SecretRequired => Self::SecretMissing(*key),
            UnknownReason::SecretMismatch => Self::SecretInvalid(*key),
            UnknownReason::NoSuchCommitment => {
                Self::GenuineRejection(format!("no commitment at {}", key))
            }
        }
    }
}

impl From<LedgerError> for ActionError {
    fn from(e: LedgerError) -> Self {
        if e.is_transport() {
            Self::TransportFailure(e.to_string())
        } else {
            Self::GenuineRejection(e.to_string())
        }
    }
}

impl From<StoreError> for ActionError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation_classes() {
        let key = CommitmentKey::new(1, [0u8; 20], 0);
        assert!(ActionError::TransportFailure("x".into()).is_retryable());
        assert!(!ActionError::TransportFailure("x".into()).is_user_visible());
        assert!(ActionError::SecretMissing(key).is_user_visible());
        assert!(!ActionError::SecretMissing(key).is_retryable());
        assert!(ActionError::GenuineRejection("x".into()).is_user_visible());
        assert!(!ActionError::NotYetEligible("x".into()).is_user_visible());
    }

    #[test]
    fn test_ledger_error_mapping() {
        let transport: ActionError = LedgerError::Timeout { waited_ms: 10 }.into();
        assert!(matches!(transport, ActionError::TransportFailure(_)));
        let missing: ActionError = LedgerError::PollNotFound(9).into();
        assert!(matches!(missing, ActionError::GenuineRejection(_)));
    }

    #[test]
    fn test_unknown_mapping() {
        let key = CommitmentKey::new(1, [0u8; 20], 0);
        assert_eq!(
            ActionError::from_unknown(&key, &UnknownReason::SecretRequired),
            ActionError::SecretMissing(key)
        );
        assert_eq!(
            ActionError::from_unknown(&key, &UnknownReason::SecretMismatch),
            ActionError::SecretInvalid(key)
        );
    }
}
