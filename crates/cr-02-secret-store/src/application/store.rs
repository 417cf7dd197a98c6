//! # Secret Store Service
//!
//! Two physical copies of every secret: a local device cache and the shared
//! metadata backend. Neither is trusted blindly; they are merged explicitly.
//!
//! ## Merge Rules
//!
//! | Local | Backend | Result |
//! |-------|---------|--------|
//! | absent | present | pulled into local, marked synced |
//! | same secret | same secret | marked synced |
//! | secret A | secret B | backend kept, conflict flagged, local kept as displaced |
//! | present | absent | pushed to backend; stale if older than the grace window |
//!
//! A local-only secret is never dropped, however old. Read paths apply the
//! same conflict rule without writing: the backend copy is served and the
//! discrepancy is logged and counted.

use cr_telemetry::{log_commitment_event, SECRET_CONFLICTS};
use shared_types::{
    short_address, Address, CommitmentKey, Hash, LifecycleStatus, PollId, Secret, TimeSource,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SecretStoreConfig;
use crate::domain::{
    PendingCommit, ReconcileReport, SecretConflict, SecretRecord, StoreError, VoteRecord,
};
use crate::ports::{LocalSecretCache, MetadataStore};

/// Result of [`SecretStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutReceipt {
    /// False if only the local copy was written; reconciliation pushes it later.
    pub backend_synced: bool,
}

/// Durable `(poll, voter, index) -> (option, salt)` mapping.
pub struct SecretStore {
    local: Arc<dyn LocalSecretCache>,
    backend: Arc<dyn MetadataStore>,
    clock: Arc<dyn TimeSource>,
    config: SecretStoreConfig,
}

impl SecretStore {
    /// Create a store over the two copies.
    pub fn new(
        local: Arc<dyn LocalSecretCache>,
        backend: Arc<dyn MetadataStore>,
        clock: Arc<dyn TimeSource>,
        config: SecretStoreConfig,
    ) -> Self {
        Self {
            local,
            backend,
            clock,
            config,
        }
    }

    /// The shared backend, also used for poll mirroring.
    pub fn backend(&self) -> &Arc<dyn MetadataStore> {
        &self.backend
    }

    /// Store a secret. The local copy is written first; a backend outage
    /// leaves it unsynced rather than failing the call.
    pub async fn put(&self, secret: Secret) -> Result<PutReceipt, StoreError> {
        let now = self.clock.now();
        let mut record = match self.local.get(&secret.key)? {
            Some(existing) if existing.secret == secret => existing,
            Some(_) => return Err(StoreError::Conflict(secret.key)),
            None => {
                let record = SecretRecord::new(secret.clone(), now);
                self.local.upsert(record.clone())?;
                record
            }
        };
        if record.synced {
            return Ok(PutReceipt {
                backend_synced: true,
            });
        }

        match self
            .backend
            .record_vote(VoteRecord::from_secret(&secret, now))
            .await
        {
            Ok(()) => {
                record.synced = true;
                self.local.upsert(record)?;
                debug!(key = %secret.key, "[cr-02] Secret stored in both copies");
                Ok(PutReceipt {
                    backend_synced: true,
                })
            }
            Err(StoreError::Conflict(key)) => {
                warn!(%key, "[cr-02] Backend holds a different secret for this commitment");
                Err(StoreError::Conflict(key))
            }
            Err(e) => {
                warn!(
                    key = %secret.key,
                    error = %e,
                    "[cr-02] Backend write failed, secret kept locally unsynced"
                );
                Ok(PutReceipt {
                    backend_synced: false,
                })
            }
        }
    }

    /// All secrets of `voter` on `poll_id`, ordered by index.
    ///
    /// Read-only merge of both copies; the backend wins on conflict and the
    /// conflict is flagged. If the backend is unreachable the local copy is
    /// returned alone.
    pub async fn get(&self, poll_id: PollId, voter: &Address) -> Result<Vec<Secret>, StoreError> {
        let mut merged: BTreeMap<u32, Secret> = self
            .local
            .list(poll_id, voter)?
            .into_iter()
            .map(|record| (record.key().index, record.secret))
            .collect();

        match self.backend.list_votes_by_voter(voter).await {
            Ok(votes) => {
                for vote in votes.iter().filter(|v| v.key.poll_id == poll_id) {
                    let backend_secret = vote.to_secret();
                    if let Some(local) = merged.get(&vote.key.index) {
                        if *local != backend_secret {
                            flag_conflict(&backend_secret, local);
                        }
                    }
                    merged.insert(vote.key.index, backend_secret);
                }
            }
            Err(e) if e.is_transient() => {
                warn!(
                    poll_id,
                    voter = %short_address(voter),
                    error = %e,
                    "[cr-02] Backend unreachable, serving local secrets only"
                );
            }
            Err(e) => return Err(e),
        }

        Ok(merged.into_values().collect())
    }

    /// Secret for one commitment, or `None` if neither copy has it.
    pub async fn get_secret(&self, key: &CommitmentKey) -> Result<Option<Secret>, StoreError> {
        let local = self.local.get(key)?;
        if let Some(record) = &local {
            if record.synced {
                return Ok(Some(record.secret.clone()));
            }
        }

        match self.backend.list_votes_by_voter(&key.voter).await {
            Ok(votes) => {
                if let Some(vote) = votes.iter().find(|v| &v.key == key) {
                    let backend_secret = vote.to_secret();
                    if let Some(record) = &local {
                        if record.secret != backend_secret {
                            flag_conflict(&backend_secret, &record.secret);
                        }
                    }
                    return Ok(Some(backend_secret));
                }
            }
            Err(e) if e.is_transient() => {
                debug!(%key, error = %e, "[cr-02] Backend unreachable, using local copy");
            }
            Err(e) => return Err(e),
        }
        Ok(local.map(|record| record.secret))
    }

    /// Local record with its advisory flags.
    pub fn record(&self, key: &CommitmentKey) -> Result<Option<SecretRecord>, StoreError> {
        self.local.get(key)
    }

    /// Local records of `voter` across all polls.
    pub fn local_records(&self, voter: &Address) -> Result<Vec<SecretRecord>, StoreError> {
        self.local.list_for_voter(voter)
    }

    /// Merge both copies for `voter`. Fails only if the backend cannot be
    /// listed at all; per-record push failures are reported instead.
    pub async fn reconcile(&self, voter: &Address) -> Result<ReconcileReport, StoreError> {
        let now = self.clock.now();
        let votes = self.backend.list_votes_by_voter(voter).await?;
        let mut local: BTreeMap<CommitmentKey, SecretRecord> = self
            .local
            .list_for_voter(voter)?
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();
        let mut report = ReconcileReport::default();

        for vote in votes {
            let backend_secret = vote.to_secret();
            match local.remove(&vote.key) {
                None => {
                    self.local.upsert(SecretRecord::from_backend(&vote))?;
                    report.pulled.push(vote.key);
                }
                Some(mut record) if record.secret == backend_secret => {
                    if !record.synced {
                        record.synced = true;
                        self.local.upsert(record)?;
                    }
                }
                Some(mut record) => {
                    report
                        .conflicts
                        .push(flag_conflict(&backend_secret, &record.secret));
                    record.displaced = Some(std::mem::replace(&mut record.secret, backend_secret));
                    record.synced = true;
                    self.local.upsert(record)?;
                }
            }
        }

        for (key, mut record) in local {
            if now.saturating_sub(record.created_at) > self.config.grace_window_secs {
                warn!(
                    %key,
                    age_secs = now.saturating_sub(record.created_at),
                    "[cr-02] Local secret missing from backend past the grace window"
                );
                report.stale_unsynced.push(key);
            }
            let vote = VoteRecord::from_secret(&record.secret, now);
            match self.backend.record_vote(vote).await {
                Ok(()) => {
                    record.synced = true;
                    self.local.upsert(record)?;
                    report.pushed.push(key);
                }
                Err(e) => {
                    warn!(%key, error = %e, "[cr-02] Push to backend failed, will retry");
                    report.push_failures.push(key);
                }
            }
        }

        if !report.is_clean() {
            info!(
                voter = %short_address(voter),
                pulled = report.pulled.len(),
                pushed = report.pushed.len(),
                stale = report.stale_unsynced.len(),
                conflicts = report.conflicts.len(),
                failures = report.push_failures.len(),
                "[cr-02] Reconciled secret copies"
            );
        }
        Ok(report)
    }

    /// Every known secret on `poll_id`: backend votes overlaid with local
    /// flags, plus local secrets the backend has not seen yet. A conflicting
    /// local secret is flagged and carried as `displaced`.
    pub async fn list_for_poll(&self, poll_id: PollId) -> Result<Vec<SecretRecord>, StoreError> {
        let mut merged: BTreeMap<CommitmentKey, SecretRecord> = self
            .local
            .list_for_poll(poll_id)?
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();

        match self.backend.list_votes_by_poll(poll_id).await {
            Ok(votes) => {
                for vote in votes {
                    let backend_secret = vote.to_secret();
                    match merged.get_mut(&vote.key) {
                        Some(record) if record.secret == backend_secret => {}
                        Some(record) => {
                            flag_conflict(&backend_secret, &record.secret);
                            record.displaced =
                                Some(std::mem::replace(&mut record.secret, backend_secret));
                        }
                        None => {
                            merged.insert(vote.key, SecretRecord::from_backend(&vote));
                        }
                    }
                }
            }
            Err(e) if e.is_transient() => {
                warn!(poll_id, error = %e, "[cr-02] Backend unreachable, listing local secrets only");
            }
            Err(e) => return Err(e),
        }

        Ok(merged.into_values().collect())
    }

    /// Persist a conclusively observed status as a local hint. Regressions
    /// are refused.
    pub fn record_status(&self, secret: &Secret, status: LifecycleStatus) -> Result<(), StoreError> {
        let mut record = self.local_or_backed(secret)?;
        if record.status_hint == Some(status) {
            return Ok(());
        }
        record.observe(status)?;
        self.local.upsert(record)
    }

    /// Flag a secret that does not open its ledger commitment. It is kept.
    pub fn mark_invalid(&self, secret: &Secret) -> Result<(), StoreError> {
        let mut record = self.local_or_backed(secret)?;
        if !record.invalid {
            log_commitment_event!(
                warn,
                "cr-02",
                "[cr-02] Secret does not match ledger commitment, flagged invalid",
                secret.key
            );
            record.invalid = true;
            self.local.upsert(record)?;
        }
        Ok(())
    }

    /// Flag a commitment whose write the ledger refused for good, so
    /// automation stops retrying it.
    pub fn mark_refused(&self, secret: &Secret) -> Result<(), StoreError> {
        let mut record = self.local_or_backed(secret)?;
        if !record.refused {
            log_commitment_event!(
                warn,
                "cr-02",
                "[cr-02] Ledger refused write, commitment excluded from automation",
                secret.key
            );
            record.refused = true;
            self.local.upsert(record)?;
        }
        Ok(())
    }

    /// Remember a secret whose commit is about to be submitted.
    pub fn stage_commit(&self, pending: PendingCommit) -> Result<(), StoreError> {
        self.local.stage(pending)
    }

    /// Secrets of commits whose index is not known yet.
    pub fn staged(&self) -> Result<Vec<PendingCommit>, StoreError> {
        self.local.staged()
    }

    /// Drop a staged secret once it is stored under its ledger index.
    pub fn complete_staged(&self, committed_hash: &Hash) -> Result<(), StoreError> {
        self.local.unstage(committed_hash)
    }

    fn local_or_backed(&self, secret: &Secret) -> Result<SecretRecord, StoreError> {
        Ok(self.local.get(&secret.key)?.unwrap_or_else(|| SecretRecord {
            synced: true,
            ..SecretRecord::new(secret.clone(), self.clock.now())
        }))
    }
}

/// Backend copy wins; the discrepancy is logged and counted, never hidden.
fn flag_conflict(backend: &Secret, local: &Secret) -> SecretConflict {
    SECRET_CONFLICTS.inc();
    log_commitment_event!(
        warn,
        "cr-02",
        "[cr-02] Local secret conflicts with backend, backend kept",
        backend.key
    );
    SecretConflict {
        key: backend.key,
        backend: backend.clone(),
        local: local.clone(),
    }
}
