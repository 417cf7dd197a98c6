//! # Engine Container
//!
//! Builds every subsystem and holds the shared handles. The devnet wiring
//! uses the in-process ledger and metadata store; swapping in production
//! adapters only changes which `Arc<dyn Trait>` goes in.

pub mod config;

pub use config::{ConfigError, RuntimeConfig};

use cr_01_ledger_client::{InMemoryLedger, TransactionExecutor};
use cr_02_secret_store::{
    FileLocalCache, InMemoryLocalCache, InMemoryMetadataStore, LocalSecretCache, SecretStore,
    StoreError,
};
use cr_03_status_inference::InferenceEngine;
use cr_04_commitment_lifecycle::LifecycleService;
use cr_05_automation_scheduler::{AttachReport, AutomationScheduler};
use shared_types::{short_address, Address, TimeSource};
use std::sync::Arc;
use tracing::info;

/// Wired engine.
pub struct EngineContainer {
    /// Clock shared by every subsystem.
    pub clock: Arc<dyn TimeSource>,
    /// Devnet ledger.
    pub ledger: Arc<InMemoryLedger>,
    /// Devnet metadata backend.
    pub backend: Arc<InMemoryMetadataStore>,
    /// Secret Store.
    pub store: Arc<SecretStore>,
    /// Lifecycle operations.
    pub lifecycle: Arc<LifecycleService>,
    /// Automation scheduler.
    pub scheduler: Arc<AutomationScheduler>,
}

impl EngineContainer {
    /// Wire the devnet engine. The scheduler's operator is authorized on
    /// the in-process ledger.
    pub fn devnet(config: &RuntimeConfig, clock: Arc<dyn TimeSource>) -> Result<Self, StoreError> {
        let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
        ledger.authorize_operator(config.scheduler.operator);

        let local: Arc<dyn LocalSecretCache> = match &config.local_cache_path {
            Some(path) => {
                let cache = FileLocalCache::open(path)?;
                info!(path = %path.display(), "[runtime] Local secret cache opened");
                Arc::new(cache)
            }
            None => Arc::new(InMemoryLocalCache::new()),
        };
        let backend = Arc::new(InMemoryMetadataStore::new());
        let store = Arc::new(SecretStore::new(
            local,
            backend.clone(),
            clock.clone(),
            config.store.clone(),
        ));

        let executor = Arc::new(TransactionExecutor::new(ledger.clone(), config.ledger.clone()));
        let inference = Arc::new(InferenceEngine::new(ledger.clone(), clock.clone()));
        let lifecycle = Arc::new(LifecycleService::new(
            executor,
            inference,
            store.clone(),
            clock.clone(),
        ));
        let scheduler = Arc::new(AutomationScheduler::new(
            lifecycle.clone(),
            clock.clone(),
            config.scheduler.clone(),
        ));

        info!(
            operator = %short_address(&config.scheduler.operator),
            "[runtime] Devnet engine wired"
        );
        Ok(Self {
            clock,
            ledger,
            backend,
            store,
            lifecycle,
            scheduler,
        })
    }

    /// A voter attached: reconcile now and keep reconciling periodically.
    pub async fn attach(&self, voter: Address) -> Result<AttachReport, StoreError> {
        let report = self.scheduler.reconciler().attach(&voter).await?;
        self.scheduler.watch_voter(voter);
        Ok(report)
    }
}
