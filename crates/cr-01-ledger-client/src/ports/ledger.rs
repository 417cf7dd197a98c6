//! # Ledger Port
//!
//! Narrow view/probe reads, dry runs and writes exposed by the poll contract.

use async_trait::async_trait;
use shared_types::{Address, Commitment, CommitmentKey, Poll, PollId, Timestamp};

use crate::domain::{LedgerCall, LedgerError, SimulationOutcome, TxHandle, TxReceipt};

/// Typed boundary over the authoritative poll contract.
///
/// Every method may fail in transport; callers must not infer state from a
/// transport failure (see [`LedgerError::is_transport`]).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Number of polls. Ids are dense: `0..poll_count`.
    async fn poll_count(&self) -> Result<u64, LedgerError>;

    /// Read a poll, including its resolved flag and winning option.
    async fn poll(&self, poll_id: PollId) -> Result<Poll, LedgerError>;

    /// Read a recorded commitment, `None` if no commitment exists at `key`.
    async fn commitment(&self, key: &CommitmentKey) -> Result<Option<Commitment>, LedgerError>;

    /// Number of commitments `voter` made on `poll_id`.
    async fn commitment_count(&self, poll_id: PollId, voter: &Address) -> Result<u32, LedgerError>;

    /// Direct "has this commitment been revealed" read.
    ///
    /// `Ok(None)` means the contract version does not expose the probe and
    /// callers must fall back to a dry-run reveal.
    async fn has_revealed(&self, key: &CommitmentKey) -> Result<Option<bool>, LedgerError>;

    /// Whether the reward of `key` was claimed.
    async fn has_claimed(&self, key: &CommitmentKey) -> Result<bool, LedgerError>;

    /// Subscription expiry of `voter` (zero if never subscribed).
    async fn subscription_expiry(&self, voter: &Address) -> Result<Timestamp, LedgerError>;

    /// Dry-run `call` as `signer` without changing state.
    async fn simulate(
        &self,
        signer: &Address,
        call: &LedgerCall,
    ) -> Result<SimulationOutcome, LedgerError>;

    /// Broadcast `call` signed by `signer`.
    async fn submit(&self, signer: &Address, call: &LedgerCall) -> Result<TxHandle, LedgerError>;

    /// Wait for the transaction to reach finality. Unbounded; callers bound it.
    async fn await_confirmation(&self, handle: &TxHandle) -> Result<TxReceipt, LedgerError>;
}
