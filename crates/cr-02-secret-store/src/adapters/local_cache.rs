//! In-memory local cache.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::{Address, CommitmentKey, Hash, PollId};
use std::collections::BTreeMap;

use crate::domain::{PendingCommit, SecretRecord, StoreError};
use crate::ports::LocalSecretCache;

/// Cache contents. Shared with the file adapter, which snapshots it.
#[derive(Debug, Clone, Default)]
pub(crate) struct CacheState {
    pub(crate) records: BTreeMap<CommitmentKey, SecretRecord>,
    pub(crate) staged: Vec<PendingCommit>,
}

/// On-disk form. JSON object keys must be strings, so records are a list.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CacheSnapshot {
    pub(crate) records: Vec<SecretRecord>,
    pub(crate) staged: Vec<PendingCommit>,
}

impl From<&CacheState> for CacheSnapshot {
    fn from(state: &CacheState) -> Self {
        Self {
            records: state.records.values().cloned().collect(),
            staged: state.staged.clone(),
        }
    }
}

impl From<CacheSnapshot> for CacheState {
    fn from(snapshot: CacheSnapshot) -> Self {
        Self {
            records: snapshot
                .records
                .into_iter()
                .map(|record| (record.key(), record))
                .collect(),
            staged: snapshot.staged,
        }
    }
}

impl CacheState {
    pub(crate) fn list(&self, poll_id: PollId, voter: &Address) -> Vec<SecretRecord> {
        let from = CommitmentKey::new(poll_id, *voter, 0);
        let to = CommitmentKey::new(poll_id, *voter, u32::MAX);
        self.records.range(from..=to).map(|(_, r)| r.clone()).collect()
    }

    pub(crate) fn list_for_voter(&self, voter: &Address) -> Vec<SecretRecord> {
        self.records
            .values()
            .filter(|r| &r.secret.key.voter == voter)
            .cloned()
            .collect()
    }

    pub(crate) fn list_for_poll(&self, poll_id: PollId) -> Vec<SecretRecord> {
        self.records
            .values()
            .filter(|r| r.secret.key.poll_id == poll_id)
            .cloned()
            .collect()
    }

    pub(crate) fn stage(&mut self, pending: PendingCommit) {
        if !self
            .staged
            .iter()
            .any(|p| p.committed_hash == pending.committed_hash)
        {
            self.staged.push(pending);
        }
    }

    pub(crate) fn unstage(&mut self, committed_hash: &Hash) {
        self.staged.retain(|p| &p.committed_hash != committed_hash);
    }
}

/// Local cache held in process memory. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryLocalCache {
    state: RwLock<CacheState>,
}

impl InMemoryLocalCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Whether the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalSecretCache for InMemoryLocalCache {
    fn get(&self, key: &CommitmentKey) -> Result<Option<SecretRecord>, StoreError> {
        Ok(self.state.read().records.get(key).cloned())
    }

    fn list(&self, poll_id: PollId, voter: &Address) -> Result<Vec<SecretRecord>, StoreError> {
        Ok(self.state.read().list(poll_id, voter))
    }

    fn list_for_voter(&self, voter: &Address) -> Result<Vec<SecretRecord>, StoreError> {
        Ok(self.state.read().list_for_voter(voter))
    }

    fn list_for_poll(&self, poll_id: PollId) -> Result<Vec<SecretRecord>, StoreError> {
        Ok(self.state.read().list_for_poll(poll_id))
    }

    fn upsert(&self, record: SecretRecord) -> Result<(), StoreError> {
        self.state.write().records.insert(record.key(), record);
        Ok(())
    }

    fn stage(&self, pending: PendingCommit) -> Result<(), StoreError> {
        self.state.write().stage(pending);
        Ok(())
    }

    fn staged(&self) -> Result<Vec<PendingCommit>, StoreError> {
        Ok(self.state.read().staged.clone())
    }

    fn unstage(&self, committed_hash: &Hash) -> Result<(), StoreError> {
        self.state.write().unstage(committed_hash);
        Ok(())
    }
}
