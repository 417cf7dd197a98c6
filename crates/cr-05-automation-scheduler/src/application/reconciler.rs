//! # Reconciliation Routine
//!
//! Runs when a voter attaches (and periodically for watched voters):
//!
//! 1. Merge the local and backend copies of the voter's secrets.
//! 2. Match staged commits against the ledger; a staged secret whose hash
//!    is found under some index is promoted to a full record.
//! 3. Re-infer every unfinished local record and persist conclusive
//!    statuses, repairing stale hints.
//!
//! Each step degrades independently: an unreachable backend skips step 1,
//! an unreadable poll leaves its staged commits staged.

use cr_02_secret_store::{PendingCommit, SecretRecord, StoreError};
use cr_03_status_inference::{StatusInference, UnknownReason};
use cr_04_commitment_lifecycle::LifecycleService;
use shared_types::{short_address, Address, CommitmentKey, PollPhase, TimeSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::AttachReport;

/// Brings local state back in line with the backend and the ledger.
pub struct ReconciliationRoutine {
    lifecycle: Arc<LifecycleService>,
    clock: Arc<dyn TimeSource>,
}

impl ReconciliationRoutine {
    /// Create a routine over `lifecycle`.
    pub fn new(lifecycle: Arc<LifecycleService>, clock: Arc<dyn TimeSource>) -> Self {
        Self { lifecycle, clock }
    }

    /// Reconcile everything held for `voter`.
    ///
    /// Only local cache failures abort; backend and ledger trouble is
    /// logged and left for the next run.
    pub async fn attach(&self, voter: &Address) -> Result<AttachReport, StoreError> {
        let store = self.lifecycle.store();
        let mut report = AttachReport::default();

        match store.reconcile(voter).await {
            Ok(merged) => report.secrets = Some(merged),
            Err(e) if e.is_transient() => {
                warn!(voter = %short_address(voter), error = %e, "[cr-05] Backend unreachable, secret merge skipped");
            }
            Err(e) => return Err(e),
        }

        let staged: Vec<PendingCommit> = store
            .staged()?
            .into_iter()
            .filter(|pending| pending.voter == *voter)
            .collect();
        for pending in staged {
            self.recover_staged(pending, &mut report).await?;
        }

        for record in store.local_records(voter)? {
            self.repair_hint(&record, &mut report).await?;
        }

        info!(
            voter = %short_address(voter),
            recovered = report.recovered.len(),
            abandoned = report.abandoned.len(),
            repaired = report.repaired.len(),
            inconclusive = report.inconclusive.len(),
            "[cr-05] Voter reconciled"
        );
        Ok(report)
    }

    async fn recover_staged(
        &self,
        pending: PendingCommit,
        report: &mut AttachReport,
    ) -> Result<(), StoreError> {
        let store = self.lifecycle.store();
        let ledger = self.lifecycle.ledger();
        let hash = pending.committed_hash;

        let count = match ledger.commitment_count(pending.poll_id, &pending.voter).await {
            Ok(count) => count,
            Err(e) => {
                warn!(poll_id = pending.poll_id, error = %e, "[cr-05] Cannot scan commitments, commit stays staged");
                return Ok(());
            }
        };

        for index in 0..count {
            let key = CommitmentKey::new(pending.poll_id, pending.voter, index);
            if let Some(existing) = store.record(&key)? {
                if existing.secret.commitment_hash() == hash {
                    store.complete_staged(&hash)?;
                    return Ok(());
                }
                continue;
            }
            let on_ledger = match ledger.commitment(&key).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(%key, error = %e, "[cr-05] Commitment read failed, commit stays staged");
                    return Ok(());
                }
            };
            if on_ledger.map_or(false, |c| c.committed_hash == hash) {
                let secret = pending.into_secret(index);
                store.put(secret).await?;
                store.complete_staged(&hash)?;
                info!(%key, "[cr-05] Staged commit recovered under ledger index");
                report.recovered.push(key);
                return Ok(());
            }
        }

        // Not on the ledger. Drop it only once committing is impossible.
        match ledger.poll(pending.poll_id).await {
            Ok(poll) if poll.phase(self.clock.now()) != PollPhase::Commit => {
                store.complete_staged(&hash)?;
                warn!(
                    poll_id = pending.poll_id,
                    voter = %short_address(&pending.voter),
                    "[cr-05] Staged commit never landed and commit window closed, abandoned"
                );
                report.abandoned.push(hash);
            }
            Ok(_) => debug!(poll_id = pending.poll_id, "[cr-05] Staged commit not on ledger yet"),
            Err(e) => warn!(poll_id = pending.poll_id, error = %e, "[cr-05] Poll read failed, commit stays staged"),
        }
        Ok(())
    }

    async fn repair_hint(
        &self,
        record: &SecretRecord,
        report: &mut AttachReport,
    ) -> Result<(), StoreError> {
        if record.invalid || record.status_hint.map_or(false, |s| s.is_terminal()) {
            return Ok(());
        }
        let key = record.key();
        let before = record.status_hint;

        let poll = match self.lifecycle.ledger().poll(key.poll_id).await {
            Ok(poll) => poll,
            Err(e) => {
                debug!(%key, error = %e, "[cr-05] Poll read failed during repair");
                report.inconclusive.push(key);
                return Ok(());
            }
        };
        let inference = self
            .lifecycle
            .observe_with_poll(&poll, &key, Some(&record.secret))
            .await;

        match &inference {
            StatusInference::Known { status, .. } if inference.is_conclusive() => {
                if before != Some(*status) {
                    report.repaired.push((key, before, *status));
                }
            }
            StatusInference::Unknown {
                reason: UnknownReason::SecretMismatch,
            } => {
                self.lifecycle.store().mark_invalid(&record.secret)?;
                warn!(%key, "[cr-05] Stored secret does not open its commitment, flagged");
            }
            _ => report.inconclusive.push(key),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_01_ledger_client::{
        InMemoryLedger, LedgerCall, LedgerClient, LedgerClientConfig, TransactionExecutor,
    };
    use cr_02_secret_store::{
        InMemoryLocalCache, InMemoryMetadataStore, MetadataStore, SecretStore, SecretStoreConfig,
        VoteRecord,
    };
    use cr_03_status_inference::InferenceEngine;
    use shared_types::{LifecycleStatus, MockTimeSource, PollId, Secret};

    const VOTER: Address = [1u8; 20];

    struct Harness {
        clock: Arc<MockTimeSource>,
        ledger: Arc<InMemoryLedger>,
        backend: Arc<InMemoryMetadataStore>,
        lifecycle: Arc<LifecycleService>,
        routine: ReconciliationRoutine,
        poll_id: PollId,
    }

    fn harness() -> Harness {
        let clock = Arc::new(MockTimeSource::new(1_000));
        let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
        let poll_id = ledger.create_poll("q", &["no", "yes"], 1_060, 1_120);
        let backend = Arc::new(InMemoryMetadataStore::new());
        let store = Arc::new(SecretStore::new(
            Arc::new(InMemoryLocalCache::new()),
            backend.clone(),
            clock.clone(),
            SecretStoreConfig::for_testing(),
        ));
        let executor = Arc::new(TransactionExecutor::new(
            ledger.clone(),
            LedgerClientConfig::for_testing(),
        ));
        let inference = Arc::new(InferenceEngine::new(ledger.clone(), clock.clone()));
        let lifecycle = Arc::new(LifecycleService::new(executor, inference, store, clock.clone()));
        let routine = ReconciliationRoutine::new(lifecycle.clone(), clock.clone());
        Harness {
            clock,
            ledger,
            backend,
            lifecycle,
            routine,
            poll_id,
        }
    }

    #[tokio::test]
    async fn test_staged_commit_recovered_after_lost_confirmation() {
        let h = harness();
        h.ledger.drop_confirmations(1);
        let result = h.lifecycle.commit(h.poll_id, VOTER, 1).await;
        assert!(result.is_err());
        assert_eq!(h.lifecycle.store().staged().unwrap().len(), 1);

        let report = h.routine.attach(&VOTER).await.unwrap();
        let key = CommitmentKey::new(h.poll_id, VOTER, 0);
        assert_eq!(report.recovered, vec![key]);
        assert!(h.lifecycle.store().staged().unwrap().is_empty());
        let record = h.lifecycle.store().record(&key).unwrap().unwrap();
        assert_eq!(record.secret.option, 1);
        assert_eq!(record.status_hint, Some(LifecycleStatus::Committed));
    }

    #[tokio::test]
    async fn test_staged_commit_abandoned_after_window() {
        let h = harness();
        h.ledger.inject_submit_failures(None, 1);
        assert!(h.lifecycle.commit(h.poll_id, VOTER, 0).await.is_err());

        // Still committable: kept.
        let report = h.routine.attach(&VOTER).await.unwrap();
        assert!(report.abandoned.is_empty());
        assert_eq!(h.lifecycle.store().staged().unwrap().len(), 1);

        h.clock.set(1_070);
        let report = h.routine.attach(&VOTER).await.unwrap();
        assert_eq!(report.abandoned.len(), 1);
        assert!(h.lifecycle.store().staged().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_secret_pulled_and_status_repaired() {
        let h = harness();
        // Committed from another device: only the backend knows the secret.
        let secret = Secret {
            key: CommitmentKey::new(h.poll_id, VOTER, 0),
            option: 1,
            salt: [4u8; 32],
        };
        h.ledger
            .submit(
                &VOTER,
                &LedgerCall::Commit {
                    poll_id: h.poll_id,
                    hash: secret.commitment_hash(),
                },
            )
            .await
            .unwrap();
        h.backend
            .record_vote(VoteRecord::from_secret(&secret, 1_000))
            .await
            .unwrap();
        h.clock.set(1_070);
        h.ledger
            .submit(
                &VOTER,
                &LedgerCall::Reveal {
                    key: secret.key,
                    option: 1,
                    salt: secret.salt,
                },
            )
            .await
            .unwrap();

        let report = h.routine.attach(&VOTER).await.unwrap();
        assert_eq!(report.secrets.unwrap().pulled, vec![secret.key]);
        assert_eq!(
            report.repaired,
            vec![(secret.key, None, LifecycleStatus::Revealed)]
        );
        let record = h.lifecycle.store().record(&secret.key).unwrap().unwrap();
        assert!(record.revealed);
    }

    #[tokio::test]
    async fn test_backend_outage_does_not_block_repair() {
        let h = harness();
        let receipt = h.lifecycle.commit(h.poll_id, VOTER, 0).await.unwrap();
        h.backend.fail_next(1);

        let report = h.routine.attach(&VOTER).await.unwrap();
        assert!(report.secrets.is_none());
        // Already hinted Committed and still Committed: nothing to repair.
        assert!(report.repaired.is_empty());
        assert!(report.inconclusive.is_empty());
        assert!(receipt.key.is_some());
    }

    #[tokio::test]
    async fn test_idempotent() {
        let h = harness();
        h.lifecycle.commit(h.poll_id, VOTER, 1).await.unwrap();
        h.clock.set(1_070);
        h.routine.attach(&VOTER).await.unwrap();
        let second = h.routine.attach(&VOTER).await.unwrap();
        assert!(second.secrets.unwrap().is_clean());
        assert!(second.recovered.is_empty());
        assert!(second.repaired.is_empty());
    }
}
