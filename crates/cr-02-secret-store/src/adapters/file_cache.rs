//! # File-Backed Local Cache
//!
//! Keeps the cache in memory and rewrites a JSON snapshot after every
//! mutation. The snapshot is written to a sibling temp file and renamed over
//! the old one, so a crash leaves either the previous or the new snapshot.

use parking_lot::RwLock;
use shared_types::{Address, CommitmentKey, Hash, PollId};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::local_cache::{CacheSnapshot, CacheState};
use crate::domain::{PendingCommit, SecretRecord, StoreError};
use crate::ports::LocalSecretCache;

/// Local cache persisted as a JSON file.
#[derive(Debug)]
pub struct FileLocalCache {
    path: PathBuf,
    state: RwLock<CacheState>,
}

impl FileLocalCache {
    /// Open the cache at `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let bytes = fs::read(&path)?;
            let snapshot: CacheSnapshot = serde_json::from_slice(&bytes)?;
            debug!(
                path = %path.display(),
                records = snapshot.records.len(),
                staged = snapshot.staged.len(),
                "[cr-02] Loaded local cache"
            );
            CacheState::from(snapshot)
        } else {
            CacheState::default()
        };
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Location of the snapshot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut CacheState),
    {
        let mut state = self.state.write();
        let mut next = state.clone();
        f(&mut next);
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    fn persist(&self, state: &CacheState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&CacheSnapshot::from(state))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocalSecretCache for FileLocalCache {
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
        self.mutate(|state| {
            state.records.insert(record.key(), record);
        })
    }

    fn stage(&self, pending: PendingCommit) -> Result<(), StoreError> {
        self.mutate(|state| state.stage(pending))
    }

    fn staged(&self) -> Result<Vec<PendingCommit>, StoreError> {
        Ok(self.state.read().staged.clone())
    }

    fn unstage(&self, committed_hash: &Hash) -> Result<(), StoreError> {
        self.mutate(|state| state.unstage(committed_hash))
    }
}
