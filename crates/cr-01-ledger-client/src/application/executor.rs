//! # Transaction Executor
//!
//! Submits writes and waits, bounded, for their confirmation.
//!
//! ## Ordering
//!
//! A signing identity has a single transaction-ordering sequence, so at most
//! one write per signer is outstanding at any time. The per-signer lock is
//! held from submission until the confirmation wait ends (confirmed,
//! reverted or timed out). Writes of different signers proceed independently.

use parking_lot::Mutex;
use shared_types::{short_address, Address};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::config::LedgerClientConfig;
use crate::domain::{LedgerCall, TxStatus, WriteOutcome};
use crate::ports::LedgerClient;

/// One async lock per signing identity.
#[derive(Default)]
pub struct SignerLocks {
    locks: Mutex<HashMap<Address, Arc<tokio::sync::Mutex<()>>>>,
}

impl SignerLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other write of `signer` is outstanding.
    pub async fn acquire(&self, signer: &Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(*signer).or_default())
        };
        lock.lock_owned().await
    }

    /// Whether a write of `signer` is outstanding right now.
    pub fn is_busy(&self, signer: &Address) -> bool {
        self.locks
            .lock()
            .get(signer)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }
}

/// Executes writes against a [`LedgerClient`].
pub struct TransactionExecutor {
    client: Arc<dyn LedgerClient>,
    config: LedgerClientConfig,
    signer_locks: SignerLocks,
}

impl TransactionExecutor {
    /// Create an executor over `client`.
    pub fn new(client: Arc<dyn LedgerClient>, config: LedgerClientConfig) -> Self {
        Self {
            client,
            config,
            signer_locks: SignerLocks::new(),
        }
    }

    /// The underlying ledger client, for reads.
    pub fn client(&self) -> &Arc<dyn LedgerClient> {
        &self.client
    }

    /// Per-signer lock table.
    pub fn signer_locks(&self) -> &SignerLocks {
        &self.signer_locks
    }

    /// Submit `call` as `signer` and wait for confirmation.
    ///
    /// Transport failures and timeouts yield [`WriteOutcome::Unknown`]: the
    /// write may have been applied and must be re-verified by inference.
    pub async fn execute(&self, signer: &Address, call: &LedgerCall) -> WriteOutcome {
        let _guard = self.signer_locks.acquire(signer).await;
        let kind = call.kind();

        let handle = match self.client.submit(signer, call).await {
            Ok(handle) => handle,
            Err(e) if e.is_transport() => {
                warn!(
                    signer = %short_address(signer),
                    %kind,
                    error = %e,
                    "[cr-01] Submission failed in transport, outcome unknown"
                );
                return WriteOutcome::Unknown {
                    tx_hash: None,
                    reason: e.to_string(),
                };
            }
            Err(e) => {
                return WriteOutcome::Rejected {
                    tx_hash: None,
                    reason: e.to_string(),
                };
            }
        };

        let timeout = self.config.confirmation_timeout();
        let waited = tokio::time::timeout(timeout, self.client.await_confirmation(&handle)).await;

        match waited {
            Ok(Ok(receipt)) => match &receipt.status {
                TxStatus::Confirmed => {
                    debug!(%kind, tx = %hex_prefix(&receipt.tx_hash), "[cr-01] Write confirmed");
                    WriteOutcome::Confirmed(receipt)
                }
                TxStatus::Reverted { reason } => WriteOutcome::Rejected {
                    tx_hash: Some(receipt.tx_hash),
                    reason: reason.clone(),
                },
            },
            Ok(Err(e)) => {
                warn!(%kind, error = %e, "[cr-01] Confirmation failed, outcome unknown");
                WriteOutcome::Unknown {
                    tx_hash: Some(handle.tx_hash),
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(
                    %kind,
                    waited_ms = timeout.as_millis() as u64,
                    tx = %hex_prefix(&handle.tx_hash),
                    "[cr-01] Confirmation timed out, outcome unknown"
                );
                WriteOutcome::Unknown {
                    tx_hash: Some(handle.tx_hash),
                    reason: format!("confirmation timed out after {}ms", timeout.as_millis()),
                }
            }
        }
    }
}

fn hex_prefix(hash: &[u8; 32]) -> String {
    hex::encode(&hash[..4])
}
