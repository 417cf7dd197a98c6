//! # Inference Engine
//!
//! Determines a commitment's true lifecycle status from cheap ledger reads,
//! falling back to dry runs when the ledger offers no direct read.
//!
//! ## Algorithm (cheapest first, stop at the first conclusive signal)
//!
//! | Poll state | Signal | Status |
//! |------------|--------|--------|
//! | commit window | time | `Committed` |
//! | reveal window | revealed probe | `Revealed` / `Committed` |
//! | reveal window, no probe | dry-run reveal (hash-checked secret) | `Committed` if it would succeed, else `Revealed` |
//! | reveal closed, unresolved | time | `AwaitingResolution` |
//! | resolved | option vs winner, claimed probe | `ResolvedLoser` / `ResolvedWinner` / `Claimed` |
//! | resolved winner, no probe | dry-run claim | `ResolvedWinner` if it would succeed, else `ResolvedLoser` |
//!
//! This path never writes.

use cr_01_ledger_client::{LedgerCall, LedgerClient, LedgerError, SimulationOutcome};
use cr_telemetry::{log_commitment_event, INFERENCE_HEURISTIC};
use shared_types::{
    Commitment, CommitmentKey, LifecycleStatus, Poll, PollPhase, Secret, TimeSource,
};
use std::sync::Arc;
use tracing::debug;

use crate::domain::{Evidence, StatusInference, UnknownReason};

/// Read-only status inference over a ledger client.
pub struct InferenceEngine {
    ledger: Arc<dyn LedgerClient>,
    clock: Arc<dyn TimeSource>,
}

fn transport(e: LedgerError) -> StatusInference {
    StatusInference::unknown(UnknownReason::Transport(e.to_string()))
}

impl InferenceEngine {
    /// Create an engine.
    pub fn new(ledger: Arc<dyn LedgerClient>, clock: Arc<dyn TimeSource>) -> Self {
        Self { ledger, clock }
    }

    /// Infer the status of `key`. `secret` enables the dry-run fallback and
    /// the winner check after resolution.
    pub async fn infer_status(
        &self,
        key: &CommitmentKey,
        secret: Option<&Secret>,
    ) -> StatusInference {
        let poll = match self.ledger.poll(key.poll_id).await {
            Ok(poll) => poll,
            Err(e) => return transport(e),
        };
        self.infer_with_poll(&poll, key, secret).await
    }

    /// Same as [`infer_status`](Self::infer_status) with the poll already read.
    pub async fn infer_with_poll(
        &self,
        poll: &Poll,
        key: &CommitmentKey,
        secret: Option<&Secret>,
    ) -> StatusInference {
        let commitment = match self.ledger.commitment(key).await {
            Ok(Some(commitment)) => commitment,
            Ok(None) => return StatusInference::unknown(UnknownReason::NoSuchCommitment),
            Err(e) => return transport(e),
        };

        let now = self.clock.now();
        let inference = match poll.phase(now) {
            PollPhase::Commit => {
                StatusInference::known(LifecycleStatus::Committed, Evidence::PhaseWindow)
            }
            PollPhase::Reveal => self.infer_in_reveal_window(&commitment, secret).await,
            PollPhase::AwaitingResolution => {
                StatusInference::known(LifecycleStatus::AwaitingResolution, Evidence::PhaseWindow)
            }
            PollPhase::Resolved => self.infer_resolved(poll, &commitment, secret).await,
        };

        debug!(%key, ?inference, "[cr-03] Inferred status");
        inference
    }

    async fn infer_in_reveal_window(
        &self,
        commitment: &Commitment,
        secret: Option<&Secret>,
    ) -> StatusInference {
        let key = &commitment.key;
        match self.ledger.has_revealed(key).await {
            Ok(Some(true)) => {
                return StatusInference::known(LifecycleStatus::Revealed, Evidence::DirectRead)
            }
            Ok(Some(false)) => {
                return StatusInference::known(LifecycleStatus::Committed, Evidence::DirectRead)
            }
            Ok(None) => {}
            Err(e) => return transport(e),
        }

        // No direct read on this ledger: dry-run the reveal itself.
        let Some(secret) = secret else {
            return StatusInference::unknown(UnknownReason::SecretRequired);
        };
        if !secret.matches(commitment) {
            // A mismatched secret reverts for its own reasons; the revert
            // says nothing about whether the commitment was revealed.
            log_commitment_event!(
                warn,
                "cr-03",
                "[cr-03] Secret does not open commitment, dry run skipped",
                key
            );
            return StatusInference::unknown(UnknownReason::SecretMismatch);
        }

        let call = LedgerCall::Reveal {
            key: *key,
            option: secret.option,
            salt: secret.salt,
        };
        match self.ledger.simulate(&key.voter, &call).await {
            Ok(SimulationOutcome::WouldSucceed) => {
                StatusInference::known(LifecycleStatus::Committed, Evidence::SpeculativeProbe)
            }
            Ok(SimulationOutcome::WouldRevert { reason }) => {
                INFERENCE_HEURISTIC.inc();
                log_commitment_event!(
                    warn,
                    "cr-03",
                    "[cr-03] Concluded revealed from a reverted dry run",
                    key,
                    reason = %reason
                );
                StatusInference::known(LifecycleStatus::Revealed, Evidence::SpeculativeProbe)
            }
            Err(e) => transport(e),
        }
    }

    async fn infer_resolved(
        &self,
        poll: &Poll,
        commitment: &Commitment,
        secret: Option<&Secret>,
    ) -> StatusInference {
        let key = &commitment.key;

        // A commitment never revealed can neither win nor claim.
        let revealed = match self.ledger.has_revealed(key).await {
            Ok(Some(false)) => {
                return StatusInference::known(LifecycleStatus::ResolvedLoser, Evidence::DirectRead)
            }
            Ok(revealed) => revealed,
            Err(e) => return transport(e),
        };

        let claimed = match self.ledger.has_claimed(key).await {
            Ok(claimed) => claimed,
            Err(e) => return transport(e),
        };

        let Some(secret) = secret else {
            return if claimed {
                StatusInference::known(LifecycleStatus::Claimed, Evidence::DirectRead)
            } else {
                StatusInference::unknown(UnknownReason::SecretRequired)
            };
        };
        if !secret.matches(commitment) {
            return StatusInference::unknown(UnknownReason::SecretMismatch);
        }

        if poll.winner() != Some(secret.option) {
            return StatusInference::known(LifecycleStatus::ResolvedLoser, Evidence::Resolution);
        }
        if claimed {
            return StatusInference::known(LifecycleStatus::Claimed, Evidence::DirectRead);
        }
        if revealed.is_none() {
            // The winning option alone does not show the vote was revealed.
            return self.dry_run_claim(key).await;
        }
        StatusInference::known(LifecycleStatus::ResolvedWinner, Evidence::Resolution)
    }

    async fn dry_run_claim(&self, key: &CommitmentKey) -> StatusInference {
        match self.ledger.simulate(&key.voter, &LedgerCall::Claim { key: *key }).await {
            Ok(SimulationOutcome::WouldSucceed) => {
                StatusInference::known(LifecycleStatus::ResolvedWinner, Evidence::Resolution)
            }
            Ok(SimulationOutcome::WouldRevert { reason }) => {
                INFERENCE_HEURISTIC.inc();
                log_commitment_event!(
                    warn,
                    "cr-03",
                    "[cr-03] Winning option but claim would revert, treated as never revealed",
                    key,
                    reason = %reason
                );
                StatusInference::known(LifecycleStatus::ResolvedLoser, Evidence::SpeculativeProbe)
            }
            Err(e) => transport(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_01_ledger_client::{InMemoryLedger, LedgerClient};
    use shared_types::{Address, MockTimeSource, PollId};

    const VOTER: Address = [1u8; 20];
    const SALT: [u8; 32] = [0x11; 32];

    struct Harness {
        clock: Arc<MockTimeSource>,
        ledger: Arc<InMemoryLedger>,
        engine: InferenceEngine,
        poll_id: PollId,
    }

    fn harness(probe: bool) -> Harness {
        let clock = Arc::new(MockTimeSource::new(1_000));
        let ledger = InMemoryLedger::new(clock.clone());
        let ledger = Arc::new(if probe {
            ledger
        } else {
            ledger.without_reveal_probe()
        });
        let poll_id = ledger.create_poll("q", &["no", "yes"], 1_060, 1_120);
        let engine = InferenceEngine::new(ledger.clone(), clock.clone());
        Harness {
            clock,
            ledger,
            engine,
            poll_id,
        }
    }

    fn secret(poll_id: PollId, option: u32) -> Secret {
        Secret {
            key: CommitmentKey::new(poll_id, VOTER, 0),
            option,
            salt: SALT,
        }
    }

    async fn send(h: &Harness, call: LedgerCall) {
        let handle = h.ledger.submit(&VOTER, &call).await.unwrap();
        assert!(h.ledger.await_confirmation(&handle).await.unwrap().is_confirmed());
    }

    async fn commit(h: &Harness, option: u32) -> Secret {
        let s = secret(h.poll_id, option);
        send(
            h,
            LedgerCall::Commit {
                poll_id: h.poll_id,
                hash: s.commitment_hash(),
            },
        )
        .await;
        s
    }

    async fn reveal(h: &Harness, s: &Secret) {
        send(
            h,
            LedgerCall::Reveal {
                key: s.key,
                option: s.option,
                salt: s.salt,
            },
        )
        .await;
    }

    #[tokio::test]
    async fn test_commit_window() {
        let h = harness(true);
        let s = commit(&h, 1).await;
        let inference = h.engine.infer_status(&s.key, None).await;
        assert_eq!(
            inference,
            StatusInference::known(LifecycleStatus::Committed, Evidence::PhaseWindow)
        );
    }

    #[tokio::test]
    async fn test_direct_probe_in_reveal_window() {
        let h = harness(true);
        let s = commit(&h, 1).await;
        h.clock.set(1_070);
        assert_eq!(
            h.engine.infer_status(&s.key, None).await.status(),
            Some(LifecycleStatus::Committed)
        );
        reveal(&h, &s).await;
        let inference = h.engine.infer_status(&s.key, None).await;
        assert_eq!(inference.status(), Some(LifecycleStatus::Revealed));
        assert!(inference.is_conclusive());
    }

    #[tokio::test]
    async fn test_speculative_probe_without_direct_read() {
        let h = harness(false);
        let s = commit(&h, 1).await;
        h.clock.set(1_070);

        let before = h.engine.infer_status(&s.key, Some(&s)).await;
        assert_eq!(
            before,
            StatusInference::known(LifecycleStatus::Committed, Evidence::SpeculativeProbe)
        );

        reveal(&h, &s).await;
        let heuristic_before = INFERENCE_HEURISTIC.get();
        let after = h.engine.infer_status(&s.key, Some(&s)).await;
        assert_eq!(
            after,
            StatusInference::known(LifecycleStatus::Revealed, Evidence::SpeculativeProbe)
        );
        assert!(INFERENCE_HEURISTIC.get() > heuristic_before);
    }

    #[tokio::test]
    async fn test_mismatched_secret_is_not_read_as_revealed() {
        let h = harness(false);
        let s = commit(&h, 1).await;
        h.clock.set(1_070);
        let wrong = Secret {
            option: 0,
            ..s.clone()
        };
        assert_eq!(
            h.engine.infer_status(&s.key, Some(&wrong)).await,
            StatusInference::unknown(UnknownReason::SecretMismatch)
        );
        assert_eq!(
            h.engine.infer_status(&s.key, None).await,
            StatusInference::unknown(UnknownReason::SecretRequired)
        );
    }

    #[tokio::test]
    async fn test_awaiting_resolution() {
        let h = harness(true);
        let s = commit(&h, 1).await;
        h.clock.set(1_120);
        assert_eq!(
            h.engine.infer_status(&s.key, Some(&s)).await.status(),
            Some(LifecycleStatus::AwaitingResolution)
        );
    }

    #[tokio::test]
    async fn test_resolved_winner_then_claimed() {
        let h = harness(true);
        let s = commit(&h, 1).await;
        h.clock.set(1_070);
        reveal(&h, &s).await;
        h.clock.set(1_130);
        send(&h, LedgerCall::Resolve { poll_id: h.poll_id }).await;

        assert_eq!(
            h.engine.infer_status(&s.key, Some(&s)).await,
            StatusInference::known(LifecycleStatus::ResolvedWinner, Evidence::Resolution)
        );
        assert_eq!(
            h.engine.infer_status(&s.key, None).await,
            StatusInference::unknown(UnknownReason::SecretRequired)
        );

        send(&h, LedgerCall::Claim { key: s.key }).await;
        assert_eq!(
            h.engine.infer_status(&s.key, None).await.status(),
            Some(LifecycleStatus::Claimed)
        );
    }

    #[tokio::test]
    async fn test_resolved_loser() {
        let h = harness(true);
        let s = commit(&h, 0).await;
        let others: Vec<(Address, [u8; 32])> = vec![([2u8; 20], [0x22; 32]), ([3u8; 20], [0x33; 32])];
        for (voter, salt) in &others {
            let call = LedgerCall::Commit {
                poll_id: h.poll_id,
                hash: shared_types::commitment_hash(1, salt),
            };
            let handle = h.ledger.submit(voter, &call).await.unwrap();
            h.ledger.await_confirmation(&handle).await.unwrap();
        }

        h.clock.set(1_070);
        reveal(&h, &s).await;
        for (voter, salt) in &others {
            let call = LedgerCall::Reveal {
                key: CommitmentKey::new(h.poll_id, *voter, 0),
                option: 1,
                salt: *salt,
            };
            let handle = h.ledger.submit(voter, &call).await.unwrap();
            h.ledger.await_confirmation(&handle).await.unwrap();
        }

        h.clock.set(1_130);
        send(&h, LedgerCall::Resolve { poll_id: h.poll_id }).await;
        assert_eq!(h.ledger.poll(h.poll_id).await.unwrap().winner(), Some(1));
        assert_eq!(
            h.engine.infer_status(&s.key, Some(&s)).await,
            StatusInference::known(LifecycleStatus::ResolvedLoser, Evidence::Resolution)
        );
    }

    #[tokio::test]
    async fn test_unrevealed_after_resolution_is_loser() {
        let h = harness(true);
        let s = commit(&h, 1).await;
        h.clock.set(1_130);
        send(&h, LedgerCall::Resolve { poll_id: h.poll_id }).await;
        assert_eq!(
            h.engine.infer_status(&s.key, Some(&s)).await,
            StatusInference::known(LifecycleStatus::ResolvedLoser, Evidence::DirectRead)
        );
    }

    #[tokio::test]
    async fn test_unrevealed_winner_on_old_contract_is_loser() {
        let h = harness(false);
        let s = commit(&h, 0).await;
        h.clock.set(1_130);
        send(&h, LedgerCall::Resolve { poll_id: h.poll_id }).await;
        assert_eq!(h.ledger.poll(h.poll_id).await.unwrap().winner(), Some(0));

        let heuristic_before = INFERENCE_HEURISTIC.get();
        assert_eq!(
            h.engine.infer_status(&s.key, Some(&s)).await,
            StatusInference::known(LifecycleStatus::ResolvedLoser, Evidence::SpeculativeProbe)
        );
        assert!(INFERENCE_HEURISTIC.get() > heuristic_before);
        assert_eq!(h.ledger.submissions(cr_01_ledger_client::CallKind::Claim), 0);
    }

    #[tokio::test]
    async fn test_revealed_winner_on_old_contract() {
        let h = harness(false);
        let s = commit(&h, 1).await;
        h.clock.set(1_070);
        reveal(&h, &s).await;
        h.clock.set(1_130);
        send(&h, LedgerCall::Resolve { poll_id: h.poll_id }).await;
        assert_eq!(
            h.engine.infer_status(&s.key, Some(&s)).await,
            StatusInference::known(LifecycleStatus::ResolvedWinner, Evidence::Resolution)
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_unknown() {
        let h = harness(true);
        let s = commit(&h, 1).await;
        h.clock.set(1_070);
        reveal(&h, &s).await;
        h.ledger.inject_read_failures(1);
        assert!(matches!(
            h.engine.infer_status(&s.key, Some(&s)).await,
            StatusInference::Unknown {
                reason: UnknownReason::Transport(_)
            }
        ));
        // Next read succeeds and the status is back.
        assert_eq!(
            h.engine.infer_status(&s.key, Some(&s)).await.status(),
            Some(LifecycleStatus::Revealed)
        );
    }

    #[tokio::test]
    async fn test_missing_commitment() {
        let h = harness(true);
        let key = CommitmentKey::new(h.poll_id, VOTER, 3);
        assert_eq!(
            h.engine.infer_status(&key, None).await,
            StatusInference::unknown(UnknownReason::NoSuchCommitment)
        );
    }
}
