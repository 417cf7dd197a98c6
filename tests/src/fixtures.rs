//! # Test Fixtures
//!
//! One fully wired engine over the in-memory ledger and metadata store,
//! with a mock clock. The default poll has options `["no", "yes"]`, commit
//! window ending at `T0 + 60` and reveal window ending at `T0 + 120`.

use cr_01_ledger_client::{InMemoryLedger, LedgerClientConfig, TransactionExecutor};
use cr_02_secret_store::{
    InMemoryLocalCache, InMemoryMetadataStore, SecretStore, SecretStoreConfig,
};
use cr_03_status_inference::InferenceEngine;
use cr_04_commitment_lifecycle::LifecycleService;
use cr_05_automation_scheduler::{AutomationScheduler, SchedulerConfig};
use shared_types::{Address, CommitmentKey, MockTimeSource, PollId, Secret, Timestamp};
use std::sync::Arc;

/// Reference time `t`.
pub const T0: Timestamp = 1_000;
/// Operator identity authorized for automated writes.
pub const OPERATOR: Address = [9u8; 20];
/// First voter.
pub const ALICE: Address = [1u8; 20];
/// Second voter.
pub const BOB: Address = [2u8; 20];
/// Third voter.
pub const CAROL: Address = [3u8; 20];

/// Every subsystem, wired.
pub struct TestEngine {
    pub clock: Arc<MockTimeSource>,
    pub ledger: Arc<InMemoryLedger>,
    pub local: Arc<InMemoryLocalCache>,
    pub backend: Arc<InMemoryMetadataStore>,
    pub store: Arc<SecretStore>,
    pub inference: Arc<InferenceEngine>,
    pub lifecycle: Arc<LifecycleService>,
    pub scheduler: Arc<AutomationScheduler>,
    pub poll_id: PollId,
}

impl TestEngine {
    /// Engine over a ledger exposing the revealed probe.
    pub fn new() -> Self {
        let clock = Arc::new(MockTimeSource::new(T0));
        Self::with_ledger(InMemoryLedger::new(clock.clone()), clock)
    }

    /// Engine over a ledger without the revealed probe.
    pub fn without_probe() -> Self {
        let clock = Arc::new(MockTimeSource::new(T0));
        Self::with_ledger(InMemoryLedger::new(clock.clone()).without_reveal_probe(), clock)
    }

    fn with_ledger(ledger: InMemoryLedger, clock: Arc<MockTimeSource>) -> Self {
        let ledger = Arc::new(ledger);
        ledger.authorize_operator(OPERATOR);
        let poll_id = ledger.create_poll("Ship it?", &["no", "yes"], T0 + 60, T0 + 120);

        let local = Arc::new(InMemoryLocalCache::new());
        let backend = Arc::new(InMemoryMetadataStore::new());
        let store = Arc::new(SecretStore::new(
            local.clone(),
            backend.clone(),
            clock.clone(),
            SecretStoreConfig::for_testing(),
        ));
        let executor = Arc::new(TransactionExecutor::new(
            ledger.clone(),
            LedgerClientConfig::for_testing(),
        ));
        let inference = Arc::new(InferenceEngine::new(ledger.clone(), clock.clone()));
        let lifecycle = Arc::new(LifecycleService::new(
            executor,
            inference.clone(),
            store.clone(),
            clock.clone(),
        ));
        let scheduler = Arc::new(AutomationScheduler::new(
            lifecycle.clone(),
            clock.clone(),
            SchedulerConfig::for_testing(OPERATOR),
        ));

        Self {
            clock,
            ledger,
            local,
            backend,
            store,
            inference,
            lifecycle,
            scheduler,
            poll_id,
        }
    }

    /// Move the clock to `T0 + offset`.
    pub fn at(&self, offset: u64) {
        self.clock.set(T0 + offset);
    }

    /// Commit `option` for `voter` and return the stored secret.
    pub async fn commit(&self, voter: Address, option: u32) -> Secret {
        let receipt = self
            .lifecycle
            .commit(self.poll_id, voter, option)
            .await
            .expect("commit");
        let key = receipt.key.expect("ledger assigned an index");
        self.secret(&key).await
    }

    /// Stored secret for `key`.
    pub async fn secret(&self, key: &CommitmentKey) -> Secret {
        self.store
            .get_secret(key)
            .await
            .expect("store readable")
            .expect("secret stored")
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
