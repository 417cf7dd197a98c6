//! # Automation Sweeps
//!
//! The scheduler acting for subscribed voters across a poll's lifetime.

#[cfg(test)]
mod tests {
    use crate::fixtures::{TestEngine, ALICE, BOB, CAROL};
    use cr_01_ledger_client::CallKind;
    use cr_04_commitment_lifecycle::{ActionError, Transition};
    use cr_05_automation_scheduler::{SchedulerError, Target};
    use shared_types::{LifecycleStatus, Secret};

    async fn three_subscribed(engine: &TestEngine) -> [Secret; 3] {
        for voter in [ALICE, BOB, CAROL] {
            engine.lifecycle.subscribe(voter, 1).await.unwrap();
        }
        [
            engine.commit(ALICE, 1).await,
            engine.commit(BOB, 1).await,
            engine.commit(CAROL, 0).await,
        ]
    }

    #[tokio::test]
    async fn test_transport_failure_isolated_within_tick() {
        let engine = TestEngine::new();
        let [alice, bob, carol] = three_subscribed(&engine).await;
        engine.at(70);
        engine.ledger.inject_submit_failures(Some(BOB), 1);

        let report = engine.scheduler.run_tick().await.unwrap();

        assert_eq!(report.items.len(), 3);
        assert_eq!(report.items[0].target, Target::Commitment(alice.key));
        assert_eq!(report.items[1].target, Target::Commitment(bob.key));
        assert_eq!(report.items[2].target, Target::Commitment(carol.key));
        assert!(report.items[0].result.as_ref().unwrap().is_executed());
        assert!(matches!(
            report.items[1].result,
            Err(ActionError::TransportFailure(_))
        ));
        assert!(report.items[2].result.as_ref().unwrap().is_executed());

        for secret in [&alice, &carol] {
            let status = engine.inference.infer_status(&secret.key, Some(secret)).await;
            assert_eq!(status.status(), Some(LifecycleStatus::Revealed));
        }
        let status = engine.inference.infer_status(&bob.key, Some(&bob)).await;
        assert_eq!(status.status(), Some(LifecycleStatus::Committed));
    }

    #[tokio::test]
    async fn test_full_poll_lifetime_automated() {
        let engine = TestEngine::new();
        let [alice, bob, carol] = three_subscribed(&engine).await;

        engine.at(30);
        assert!(engine.scheduler.run_tick().await.unwrap().items.is_empty());

        engine.at(70);
        assert_eq!(engine.scheduler.run_tick().await.unwrap().executed(), 3);

        engine.at(125);
        let report = engine.scheduler.run_tick().await.unwrap();
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].transition, Transition::Resolve);

        let report = engine.scheduler.run_tick().await.unwrap();
        assert_eq!(report.executed(), 2);
        assert!(report.outcome_for(&Target::Commitment(carol.key)).is_none());

        for (secret, expected) in [
            (&alice, LifecycleStatus::Claimed),
            (&bob, LifecycleStatus::Claimed),
            (&carol, LifecycleStatus::ResolvedLoser),
        ] {
            let status = engine.inference.infer_status(&secret.key, Some(secret)).await;
            assert_eq!(status.status(), Some(expected));
        }

        // Quiescent afterwards.
        let report = engine.scheduler.run_tick().await.unwrap();
        assert!(report.items.is_empty());
        assert_eq!(engine.ledger.submissions(CallKind::Reveal), 3);
        assert_eq!(engine.ledger.submissions(CallKind::Resolve), 1);
        assert_eq!(engine.ledger.submissions(CallKind::Claim), 2);
    }

    #[tokio::test]
    async fn test_expired_subscription_stops_automation() {
        let engine = TestEngine::new();
        engine.lifecycle.subscribe(ALICE, 1).await.unwrap();
        let secret = engine.commit(ALICE, 1).await;
        let expiry = engine.lifecycle.subscription(ALICE).await.unwrap().expiry;

        // A poll whose reveal window opens after the subscription lapsed.
        let late_poll = engine
            .ledger
            .create_poll("later", &["a", "b"], expiry + 10, expiry + 70);
        let late = engine.lifecycle.commit(late_poll, ALICE, 0).await.unwrap();
        engine.clock.set(expiry + 20);

        let report = engine.scheduler.run_tick().await.unwrap();
        assert!(report
            .outcome_for(&Target::Commitment(late.key.unwrap()))
            .is_none());
        assert!(report.outcome_for(&Target::Commitment(secret.key)).is_none());
        assert_eq!(engine.ledger.submissions(CallKind::Reveal), 0);
    }

    #[tokio::test]
    async fn test_unrevealed_winner_never_claimed() {
        let engine = TestEngine::without_probe();
        let secret = engine.commit(ALICE, 0).await;

        // Nobody reveals; the empty tally resolves to option 0.
        engine.at(125);
        let report = engine.scheduler.run_tick().await.unwrap();
        assert_eq!(report.items[0].transition, Transition::Resolve);
        let poll = engine.lifecycle.ledger().poll(engine.poll_id).await.unwrap();
        assert_eq!(poll.winner(), Some(secret.option));

        engine.lifecycle.subscribe(ALICE, 1).await.unwrap();
        for _ in 0..3 {
            let report = engine.scheduler.run_tick().await.unwrap();
            assert!(matches!(
                report.outcome_for(&Target::Commitment(secret.key)),
                None | Some(Err(ActionError::GenuineRejection(_)))
            ));
        }
        assert_eq!(engine.ledger.submissions(CallKind::Claim), 0);
        assert_eq!(engine.ledger.confirmed_writes(CallKind::Claim), 0);
    }

    #[tokio::test]
    async fn test_refused_claim_not_resubmitted() {
        let engine = TestEngine::new();
        let [alice, ..] = three_subscribed(&engine).await;
        engine.at(70);
        engine.scheduler.run_tick().await.unwrap();
        engine.at(125);
        engine.scheduler.run_tick().await.unwrap();

        // A claim signed by someone who may not act for Alice is reverted
        // by the ledger while she is still a conclusive winner.
        let err = engine.lifecycle.claim(&alice.key, &[7u8; 20]).await.unwrap_err();
        assert!(matches!(err, ActionError::GenuineRejection(_)));
        assert_eq!(engine.ledger.submissions(CallKind::Claim), 1);

        for _ in 0..2 {
            let report = engine.scheduler.run_tick().await.unwrap();
            assert!(report.outcome_for(&Target::Commitment(alice.key)).is_none());
        }
        // Bob still claimed once; Alice never again.
        assert_eq!(engine.ledger.submissions(CallKind::Claim), 2);
        assert_eq!(engine.ledger.confirmed_writes(CallKind::Claim), 1);
    }

    #[tokio::test]
    async fn test_overlapping_tick_skipped() {
        let engine = TestEngine::new();
        let guard = engine.scheduler.lease().try_acquire().unwrap();
        let err = engine.scheduler.run_tick().await.unwrap_err();
        assert_eq!(err, SchedulerError::TickInFlight);
        drop(guard);
        assert_eq!(engine.scheduler.run_tick().await.unwrap().tick, 1);
    }
}
