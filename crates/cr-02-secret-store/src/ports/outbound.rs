//! # Outbound Ports
//!
//! Local device cache and shared metadata backend.

use async_trait::async_trait;
use shared_types::{Address, CommitmentKey, Hash, Poll, PollId, Timestamp};

use crate::domain::{PendingCommit, PollFilter, SecretRecord, StoreError, VoteRecord};

/// Local device cache. Fast, not shared across devices, advisory only.
pub trait LocalSecretCache: Send + Sync {
    /// Record for one commitment.
    fn get(&self, key: &CommitmentKey) -> Result<Option<SecretRecord>, StoreError>;

    /// Records of `voter` on `poll_id`, ordered by index.
    fn list(&self, poll_id: PollId, voter: &Address) -> Result<Vec<SecretRecord>, StoreError>;

    /// Records of `voter` across all polls, ordered by poll then index.
    fn list_for_voter(&self, voter: &Address) -> Result<Vec<SecretRecord>, StoreError>;

    /// Records of every voter on `poll_id`.
    fn list_for_poll(&self, poll_id: PollId) -> Result<Vec<SecretRecord>, StoreError>;

    /// Insert or replace the record at `record.key()`.
    fn upsert(&self, record: SecretRecord) -> Result<(), StoreError>;

    /// Stage a secret whose commit is in flight.
    fn stage(&self, pending: PendingCommit) -> Result<(), StoreError>;

    /// All staged secrets.
    fn staged(&self) -> Result<Vec<PendingCommit>, StoreError>;

    /// Drop the staged secret committed under `committed_hash`.
    fn unstage(&self, committed_hash: &Hash) -> Result<(), StoreError>;
}

/// Poll/vote metadata store (CRUD layer). The engine uses it as the durable,
/// cross-device half of the Secret Store and as the list of all commitments.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert or refresh mirrored poll metadata.
    async fn upsert_poll(&self, poll: Poll) -> Result<(), StoreError>;

    /// Mirrored polls matching `filter`, ordered by id.
    async fn list_polls(&self, filter: PollFilter) -> Result<Vec<Poll>, StoreError>;

    /// Append a vote. Idempotent for identical content; a different vote at
    /// the same key fails with [`StoreError::Conflict`].
    async fn record_vote(&self, vote: VoteRecord) -> Result<(), StoreError>;

    /// All votes of `voter`, ordered by key.
    async fn list_votes_by_voter(&self, voter: &Address) -> Result<Vec<VoteRecord>, StoreError>;

    /// All votes on `poll_id`, ordered by key.
    async fn list_votes_by_poll(&self, poll_id: PollId) -> Result<Vec<VoteRecord>, StoreError>;

    /// Votes of `voter` on polls whose reveal window contains `now`.
    async fn list_active_reveals(
        &self,
        voter: &Address,
        now: Timestamp,
    ) -> Result<Vec<VoteRecord>, StoreError>;
}
