//! # Lifecycle Scenarios
//!
//! One commitment walked through commit, reveal, resolve and claim, checked
//! against what inference reports at every step.

#[cfg(test)]
mod tests {
    use crate::fixtures::{TestEngine, ALICE, BOB, CAROL, OPERATOR};
    use cr_01_ledger_client::{CallKind, LedgerCall, LedgerClient};
    use cr_03_status_inference::{Evidence, StatusInference};
    use cr_04_commitment_lifecycle::{ActionError, ActionOutcome};
    use shared_types::{CommitmentKey, LifecycleStatus};

    // =========================================================================
    // REVEAL
    // =========================================================================

    #[tokio::test]
    async fn test_committed_then_revealed() {
        let engine = TestEngine::new();
        engine.at(10);
        let secret = engine.commit(ALICE, 1).await;

        engine.at(70);
        let before = engine.inference.infer_status(&secret.key, Some(&secret)).await;
        assert_eq!(before.status(), Some(LifecycleStatus::Committed));

        let outcome = engine.lifecycle.reveal(&secret.key, &ALICE).await.unwrap();
        assert!(outcome.is_executed());

        let after = engine.inference.infer_status(&secret.key, Some(&secret)).await;
        assert_eq!(after.status(), Some(LifecycleStatus::Revealed));
        assert!(after.is_conclusive());
    }

    #[tokio::test]
    async fn test_revealed_inferred_by_dry_run_without_probe() {
        let engine = TestEngine::without_probe();
        engine.at(10);
        let secret = engine.commit(ALICE, 1).await;
        engine.at(70);
        engine.lifecycle.reveal(&secret.key, &ALICE).await.unwrap();

        let after = engine.inference.infer_status(&secret.key, Some(&secret)).await;
        assert_eq!(
            after,
            StatusInference::Known {
                status: LifecycleStatus::Revealed,
                evidence: Evidence::SpeculativeProbe,
            }
        );
        assert!(after.is_heuristic());
    }

    // =========================================================================
    // RESOLVE AND CLAIM
    // =========================================================================

    #[tokio::test]
    async fn test_resolved_winner_then_claimed() {
        let engine = TestEngine::new();
        engine.at(10);
        let secret = engine.commit(ALICE, 1).await;
        engine.at(70);
        engine.lifecycle.reveal(&secret.key, &ALICE).await.unwrap();

        engine.at(121);
        let resolved = engine.lifecycle.resolve(engine.poll_id, &BOB).await.unwrap();
        assert!(resolved.is_executed());
        let poll = engine.ledger.poll(engine.poll_id).await.unwrap();
        assert_eq!(poll.winner(), Some(1));

        let status = engine.inference.infer_status(&secret.key, Some(&secret)).await;
        assert_eq!(status.status(), Some(LifecycleStatus::ResolvedWinner));

        let claimed = engine.lifecycle.claim(&secret.key, &ALICE).await.unwrap();
        assert!(claimed.is_executed());
        let status = engine.inference.infer_status(&secret.key, Some(&secret)).await;
        assert_eq!(status.status(), Some(LifecycleStatus::Claimed));
    }

    #[tokio::test]
    async fn test_second_resolve_is_already_done() {
        let engine = TestEngine::new();
        engine.at(121);
        engine.lifecycle.resolve(engine.poll_id, &ALICE).await.unwrap();
        let again = engine.lifecycle.resolve(engine.poll_id, &BOB).await.unwrap();
        assert_eq!(again, ActionOutcome::AlreadyDone { status: None });
        assert_eq!(engine.ledger.confirmed_writes(CallKind::Resolve), 1);
    }

    // =========================================================================
    // IDEMPOTENCE
    // =========================================================================

    #[tokio::test]
    async fn test_second_reveal_is_already_done() {
        let engine = TestEngine::new();
        engine.at(10);
        let secret = engine.commit(ALICE, 1).await;
        engine.at(70);
        engine.lifecycle.reveal(&secret.key, &ALICE).await.unwrap();

        let again = engine.lifecycle.reveal(&secret.key, &ALICE).await.unwrap();
        assert!(matches!(
            again,
            ActionOutcome::AlreadyDone {
                status: Some(LifecycleStatus::Revealed)
            }
        ));
        assert_eq!(engine.ledger.submissions(CallKind::Reveal), 1);
        assert_eq!(engine.ledger.confirmed_writes(CallKind::Reveal), 1);
    }

    #[tokio::test]
    async fn test_second_claim_is_already_done() {
        let engine = TestEngine::new();
        let secret = engine.commit(ALICE, 1).await;
        engine.at(70);
        engine.lifecycle.reveal(&secret.key, &ALICE).await.unwrap();
        engine.at(121);
        engine.lifecycle.resolve(engine.poll_id, &ALICE).await.unwrap();
        engine.lifecycle.claim(&secret.key, &ALICE).await.unwrap();

        let again = engine.lifecycle.claim(&secret.key, &ALICE).await.unwrap();
        assert!(!again.is_executed());
        assert_eq!(engine.ledger.confirmed_writes(CallKind::Claim), 1);
    }

    #[tokio::test]
    async fn test_reveal_done_elsewhere_is_already_done() {
        // Another device revealed: the local hint still says Committed.
        let engine = TestEngine::new();
        let secret = engine.commit(ALICE, 0).await;
        engine.at(70);
        engine
            .ledger
            .submit(
                &ALICE,
                &LedgerCall::Reveal {
                    key: secret.key,
                    option: secret.option,
                    salt: secret.salt,
                },
            )
            .await
            .unwrap();

        let outcome = engine.lifecycle.reveal(&secret.key, &ALICE).await.unwrap();
        assert!(!outcome.is_executed());
        assert_eq!(engine.ledger.confirmed_writes(CallKind::Reveal), 1);
    }

    // =========================================================================
    // SECRET DEFECTS
    // =========================================================================

    #[tokio::test]
    async fn test_missing_secret_submits_nothing() {
        let engine = TestEngine::new();
        // Committed outside the engine: no secret anywhere.
        engine
            .ledger
            .submit(
                &ALICE,
                &LedgerCall::Commit {
                    poll_id: engine.poll_id,
                    hash: [7u8; 32],
                },
            )
            .await
            .unwrap();
        let key = CommitmentKey::new(engine.poll_id, ALICE, 0);
        engine.at(70);

        let err = engine.lifecycle.reveal(&key, &ALICE).await.unwrap_err();
        assert_eq!(err, ActionError::SecretMissing(key));
        assert!(err.is_user_visible());
        assert_eq!(engine.ledger.submissions(CallKind::Reveal), 0);
    }

    #[tokio::test]
    async fn test_loser_cannot_claim() {
        let engine = TestEngine::new();
        let alice = engine.commit(ALICE, 1).await;
        let bob = engine.commit(BOB, 1).await;
        let carol = engine.commit(CAROL, 0).await;
        engine.at(70);
        for secret in [&alice, &bob, &carol] {
            engine
                .lifecycle
                .reveal(&secret.key, &secret.key.voter)
                .await
                .unwrap();
        }

        engine.at(121);
        engine.lifecycle.resolve(engine.poll_id, &ALICE).await.unwrap();
        let status = engine.inference.infer_status(&carol.key, Some(&carol)).await;
        assert_eq!(status.status(), Some(LifecycleStatus::ResolvedLoser));

        let err = engine.lifecycle.claim(&carol.key, &OPERATOR).await.unwrap_err();
        assert!(matches!(err, ActionError::GenuineRejection(_)));
        assert_eq!(engine.ledger.submissions(CallKind::Claim), 0);
        assert!(engine
            .lifecycle
            .claim(&alice.key, &OPERATOR)
            .await
            .unwrap()
            .is_executed());
    }
}
