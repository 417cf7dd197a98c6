//! # Properties
//!
//! Monotonicity of observed statuses under arbitrary interleavings of time
//! and actions, and convergence of the secret merge.

#[cfg(test)]
mod tests {
    use crate::fixtures::{TestEngine, ALICE, BOB, T0};
    use cr_02_secret_store::{LocalSecretCache, MetadataStore, VoteRecord};
    use proptest::prelude::*;
    use shared_types::{CommitmentKey, LifecycleStatus, Secret};

    // =========================================================================
    // MONOTONICITY
    // =========================================================================

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Wait(u64),
        Reveal,
        Resolve,
        Claim,
    }

    fn any_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (1u64..40).prop_map(Step::Wait),
            Just(Step::Reveal),
            Just(Step::Resolve),
            Just(Step::Claim),
        ]
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    async fn observed_statuses(
        probe: bool,
        option: u32,
        steps: &[Step],
    ) -> Vec<LifecycleStatus> {
        let engine = if probe {
            TestEngine::new()
        } else {
            TestEngine::without_probe()
        };
        let secret = engine.commit(ALICE, option).await;
        // A rival so the outcome depends on whether ALICE revealed.
        let rival = engine.commit(BOB, 1 - option).await;

        let mut seen = Vec::new();
        for step in steps {
            match step {
                Step::Wait(secs) => engine.clock.advance(*secs),
                Step::Reveal => {
                    let _ = engine.lifecycle.reveal(&secret.key, &ALICE).await;
                    let _ = engine.lifecycle.reveal(&rival.key, &BOB).await;
                }
                Step::Resolve => {
                    let _ = engine.lifecycle.resolve(engine.poll_id, &BOB).await;
                }
                Step::Claim => {
                    let _ = engine.lifecycle.claim(&secret.key, &ALICE).await;
                }
            }
            let inference = engine.inference.infer_status(&secret.key, Some(&secret)).await;
            if inference.is_conclusive() {
                if let Some(status) = inference.status() {
                    seen.push(status);
                }
            }
        }
        seen
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Conclusive observations never move backwards.
        #[test]
        fn prop_observed_statuses_are_monotonic(
            probe in any::<bool>(),
            option in 0u32..2,
            steps in prop::collection::vec(any_step(), 1..24),
        ) {
            let seen = runtime().block_on(observed_statuses(probe, option, &steps));
            for pair in seen.windows(2) {
                prop_assert!(
                    pair[0].check_successor(pair[1]).is_ok(),
                    "{} observed after {}",
                    pair[1],
                    pair[0]
                );
            }
        }

        /// Once revealed, never reported as committed again.
        #[test]
        fn prop_revealed_never_regresses(waits in prop::collection::vec(1u64..30, 1..10)) {
            let seen = runtime().block_on(async {
                let engine = TestEngine::new();
                let secret = engine.commit(ALICE, 1).await;
                engine.clock.set(T0 + 70);
                engine.lifecycle.reveal(&secret.key, &ALICE).await.unwrap();
                let mut seen = Vec::new();
                for wait in &waits {
                    engine.clock.advance(*wait);
                    let _ = engine.lifecycle.resolve(engine.poll_id, &BOB).await;
                    let inference = engine.inference.infer_status(&secret.key, Some(&secret)).await;
                    seen.extend(inference.status());
                }
                seen
            });
            prop_assert!(seen.iter().all(|s| *s != LifecycleStatus::Committed));
        }
    }

    // =========================================================================
    // RECONCILIATION CONVERGENCE
    // =========================================================================

    #[tokio::test]
    async fn test_backend_entry_pulled_unmodified() {
        let engine = TestEngine::new();
        let secret = Secret {
            key: CommitmentKey::new(engine.poll_id, ALICE, 0),
            option: 1,
            salt: [0x5a; 32],
        };
        engine
            .backend
            .record_vote(VoteRecord::from_secret(&secret, T0))
            .await
            .unwrap();
        assert!(engine.local.get(&secret.key).unwrap().is_none());

        let report = engine.store.reconcile(&ALICE).await.unwrap();
        assert_eq!(report.pulled, vec![secret.key]);

        let local = engine.local.get(&secret.key).unwrap().unwrap();
        assert_eq!(local.secret, secret);
        assert!(local.synced);

        // A second pass has nothing left to do.
        assert!(engine.store.reconcile(&ALICE).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_local_entry_pushed_to_backend() {
        let engine = TestEngine::new();
        engine.backend.fail_next_writes(1);
        let secret = engine.commit(ALICE, 0).await;
        assert!(!engine.local.get(&secret.key).unwrap().unwrap().synced);

        let report = engine.store.reconcile(&ALICE).await.unwrap();
        assert_eq!(report.pushed, vec![secret.key]);
        let votes = engine.backend.list_votes_by_voter(&ALICE).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].to_secret(), secret);
    }
}
