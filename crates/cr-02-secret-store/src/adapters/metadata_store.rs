//! # In-Memory Metadata Store
//!
//! Stand-in for the poll/vote CRUD backend. Shared by every device of a
//! voter in the devnet runtime and in tests.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Address, CommitmentKey, Poll, PollId, Timestamp};
use std::collections::BTreeMap;

use crate::domain::{PollFilter, StoreError, VoteRecord};
use crate::ports::MetadataStore;

#[derive(Debug, Default)]
struct Tables {
    polls: BTreeMap<PollId, Poll>,
    votes: BTreeMap<CommitmentKey, VoteRecord>,
}

/// Poll/vote store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    tables: RwLock<Tables>,
    failures: Mutex<u32>,
    write_failures: Mutex<u32>,
}

impl InMemoryMetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls with [`StoreError::Backend`].
    pub fn fail_next(&self, times: u32) {
        *self.failures.lock() += times;
    }

    /// Fail the next `times` vote writes only; reads keep working.
    pub fn fail_next_writes(&self, times: u32) {
        *self.write_failures.lock() += times;
    }

    /// Number of recorded votes.
    pub fn vote_count(&self) -> usize {
        self.tables.read().votes.len()
    }

    fn take_failure(&self) -> Result<(), StoreError> {
        let mut failures = self.failures.lock();
        if *failures > 0 {
            *failures -= 1;
            return Err(StoreError::Backend("metadata backend unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn upsert_poll(&self, poll: Poll) -> Result<(), StoreError> {
        self.take_failure()?;
        self.tables.write().polls.insert(poll.id, poll);
        Ok(())
    }

    async fn list_polls(&self, filter: PollFilter) -> Result<Vec<Poll>, StoreError> {
        self.take_failure()?;
        let tables = self.tables.read();
        Ok(tables
            .polls
            .values()
            .filter(|poll| match filter {
                PollFilter::All => true,
                PollFilter::Unresolved => !poll.resolved,
                PollFilter::Revealable(now) => !poll.resolved && poll.in_reveal_window(now),
            })
            .cloned()
            .collect())
    }

    async fn record_vote(&self, vote: VoteRecord) -> Result<(), StoreError> {
        self.take_failure()?;
        {
            let mut write_failures = self.write_failures.lock();
            if *write_failures > 0 {
                *write_failures -= 1;
                return Err(StoreError::Backend("vote write rejected".to_string()));
            }
        }
        let mut tables = self.tables.write();
        match tables.votes.get(&vote.key) {
            Some(existing) if existing.same_content(&vote) => Ok(()),
            Some(_) => Err(StoreError::Conflict(vote.key)),
            None => {
                tables.votes.insert(vote.key, vote);
                Ok(())
            }
        }
    }

    async fn list_votes_by_voter(&self, voter: &Address) -> Result<Vec<VoteRecord>, StoreError> {
        self.take_failure()?;
        Ok(self
            .tables
            .read()
            .votes
            .values()
            .filter(|vote| &vote.key.voter == voter)
            .cloned()
            .collect())
    }

    async fn list_votes_by_poll(&self, poll_id: PollId) -> Result<Vec<VoteRecord>, StoreError> {
        self.take_failure()?;
        Ok(self
            .tables
            .read()
            .votes
            .values()
            .filter(|vote| vote.key.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn list_active_reveals(
        &self,
        voter: &Address,
        now: Timestamp,
    ) -> Result<Vec<VoteRecord>, StoreError> {
        self.take_failure()?;
        let tables = self.tables.read();
        Ok(tables
            .votes
            .values()
            .filter(|vote| &vote.key.voter == voter)
            .filter(|vote| {
                tables
                    .polls
                    .get(&vote.key.poll_id)
                    .map_or(false, |poll| !poll.resolved && poll.in_reveal_window(now))
            })
            .cloned()
            .collect())
    }
}
