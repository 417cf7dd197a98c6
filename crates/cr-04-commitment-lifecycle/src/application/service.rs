//! # Lifecycle Service
//!
//! Every write follows the same path:
//!
//! 1. Infer the current status.
//! 2. Authorize against the transition table; `AlreadyDone` submits nothing.
//! 3. Submit and wait (bounded) for confirmation.
//! 4. Confirmed: advance the local status hint.
//!    Rejected: re-infer, because the revert may mean "already done".
//!    Unknown: report `TransportFailure`; the next inference settles it.
//!
//! Only conclusive inferences are persisted as hints. Dry-run conclusions
//! are used for the decision at hand and then forgotten. A write refused for
//! good (on conclusive evidence, or by the ledger itself) marks the record
//! refused so automation never resubmits it.

use cr_01_ledger_client::{LedgerCall, LedgerClient, LedgerEvent, TransactionExecutor, WriteOutcome};
use cr_02_secret_store::{PendingCommit, SecretStore, StoreError};
use cr_03_status_inference::{InferenceEngine, StatusInference};
use cr_telemetry::{log_commitment_event, LIFECYCLE_WRITES};
use shared_types::{
    commitment_hash, short_address, Address, CommitmentKey, LifecycleStatus, Poll, PollId,
    PollPhase, Salt, Secret, Subscription, TimeSource,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{
    authorize, target_status, ActionError, ActionOutcome, CommitReceipt, Transition, Verdict,
};

/// Shared lifecycle logic for interactive actions and automation.
pub struct LifecycleService {
    executor: Arc<TransactionExecutor>,
    inference: Arc<InferenceEngine>,
    store: Arc<SecretStore>,
    clock: Arc<dyn TimeSource>,
}

impl LifecycleService {
    /// Create a service.
    pub fn new(
        executor: Arc<TransactionExecutor>,
        inference: Arc<InferenceEngine>,
        store: Arc<SecretStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            executor,
            inference,
            store,
            clock,
        }
    }

    /// Ledger reads.
    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        self.executor.client()
    }

    /// The Secret Store.
    pub fn store(&self) -> &Arc<SecretStore> {
        &self.store
    }

    /// The inference engine.
    pub fn inference(&self) -> &Arc<InferenceEngine> {
        &self.inference
    }

    /// Commit a vote for `option`. The secret is staged locally before
    /// submission and stored under the ledger-assigned index afterwards.
    pub async fn commit(
        &self,
        poll_id: PollId,
        voter: Address,
        option: u32,
    ) -> Result<CommitReceipt, ActionError> {
        let poll = self.ledger().poll(poll_id).await?;
        if !poll.has_option(option) {
            return Err(ActionError::GenuineRejection(format!(
                "poll {} has no option {}",
                poll_id, option
            )));
        }
        let now = self.clock.now();
        if poll.phase(now) != PollPhase::Commit {
            return Err(ActionError::GenuineRejection("commit window closed".to_string()));
        }

        let salt: Salt = rand::random();
        let hash = commitment_hash(option, &salt);
        let pending = PendingCommit {
            poll_id,
            voter,
            committed_hash: hash,
            option,
            salt,
            staged_at: now,
        };
        self.store.stage_commit(pending.clone())?;

        let call = LedgerCall::Commit { poll_id, hash };
        let receipt = match self.executor.execute(&voter, &call).await {
            WriteOutcome::Confirmed(receipt) => receipt,
            WriteOutcome::Rejected { reason, .. } => {
                self.store.complete_staged(&hash)?;
                count("commit", "rejected");
                return Err(ActionError::GenuineRejection(reason));
            }
            WriteOutcome::Unknown { reason, .. } => {
                // Stays staged; reconciliation matches it against the ledger.
                count("commit", "unknown");
                return Err(ActionError::TransportFailure(reason));
            }
        };
        count("commit", "executed");

        let Some(index) = receipt.assigned_index() else {
            warn!(
                poll_id,
                voter = %short_address(&voter),
                "[cr-04] Commit receipt carried no index, secret left staged"
            );
            return Ok(CommitReceipt {
                tx_hash: receipt.tx_hash,
                committed_hash: hash,
                key: None,
                backend_synced: false,
            });
        };

        let secret = pending.into_secret(index);
        let put = match self.store.put(secret.clone()).await {
            Ok(put) => put,
            Err(e) => {
                error!(key = %secret.key, error = %e, "[cr-04] Committed secret could not be stored, kept staged");
                return Err(e.into());
            }
        };
        self.store.complete_staged(&hash)?;
        self.persist_hint(&secret, LifecycleStatus::Committed);
        log_commitment_event!(info, "cr-04", "[cr-04] Vote committed", secret.key);

        Ok(CommitReceipt {
            tx_hash: receipt.tx_hash,
            committed_hash: hash,
            key: Some(secret.key),
            backend_synced: put.backend_synced,
        })
    }

    /// Reveal a commitment, signing as `signer` (the voter or an operator).
    pub async fn reveal(
        &self,
        key: &CommitmentKey,
        signer: &Address,
    ) -> Result<ActionOutcome, ActionError> {
        let result = self.reveal_inner(key, signer).await;
        record(Transition::Reveal, &result);
        result
    }

    async fn reveal_inner(
        &self,
        key: &CommitmentKey,
        signer: &Address,
    ) -> Result<ActionOutcome, ActionError> {
        // No secret, no ledger traffic.
        let secret = self
            .store
            .get_secret(key)
            .await?
            .ok_or(ActionError::SecretMissing(*key))?;

        let poll = self.ledger().poll(key.poll_id).await?;
        let commitment = self
            .ledger()
            .commitment(key)
            .await?
            .ok_or_else(|| ActionError::GenuineRejection(format!("no commitment at {}", key)))?;
        if !secret.matches(&commitment) {
            self.flag_invalid(&secret);
            return Err(ActionError::SecretInvalid(*key));
        }

        let call = LedgerCall::Reveal {
            key: *key,
            option: secret.option,
            salt: secret.salt,
        };
        self.drive(Transition::Reveal, &poll, key, Some(&secret), signer, call)
            .await
    }

    /// Resolve a poll. Public good: any signer may do it once the reveal
    /// window has closed.
    pub async fn resolve(
        &self,
        poll_id: PollId,
        signer: &Address,
    ) -> Result<ActionOutcome, ActionError> {
        let result = self.resolve_inner(poll_id, signer).await;
        record(Transition::Resolve, &result);
        result
    }

    async fn resolve_inner(
        &self,
        poll_id: PollId,
        signer: &Address,
    ) -> Result<ActionOutcome, ActionError> {
        let poll = self.ledger().poll(poll_id).await?;
        match authorize(Transition::Resolve, poll.phase(self.clock.now()), None) {
            Verdict::Proceed => {}
            Verdict::AlreadyDone => return Ok(ActionOutcome::AlreadyDone { status: None }),
            Verdict::NotYetEligible(why) => return Err(ActionError::NotYetEligible(why.into())),
            Verdict::Refused(why) => return Err(ActionError::GenuineRejection(why.into())),
        }

        match self
            .executor
            .execute(signer, &LedgerCall::Resolve { poll_id })
            .await
        {
            WriteOutcome::Confirmed(receipt) => {
                let winner = receipt.events.iter().find_map(|event| match event {
                    LedgerEvent::Resolved { winning_option, .. } => Some(*winning_option),
                    _ => None,
                });
                info!(poll_id, ?winner, "[cr-04] Poll resolved");
                Ok(ActionOutcome::Executed {
                    tx_hash: receipt.tx_hash,
                    status: None,
                })
            }
            WriteOutcome::Rejected { reason, .. } => {
                let poll = self
                    .ledger()
                    .poll(poll_id)
                    .await
                    .map_err(|e| ActionError::Inconclusive(e.to_string()))?;
                if poll.resolved {
                    // Someone else got there first.
                    Ok(ActionOutcome::AlreadyDone { status: None })
                } else {
                    Err(ActionError::GenuineRejection(reason))
                }
            }
            WriteOutcome::Unknown { reason, .. } => Err(ActionError::TransportFailure(reason)),
        }
    }

    /// Claim the reward of a winning commitment.
    pub async fn claim(
        &self,
        key: &CommitmentKey,
        signer: &Address,
    ) -> Result<ActionOutcome, ActionError> {
        let result = self.claim_inner(key, signer).await;
        record(Transition::Claim, &result);
        result
    }

    async fn claim_inner(
        &self,
        key: &CommitmentKey,
        signer: &Address,
    ) -> Result<ActionOutcome, ActionError> {
        let secret = self.store.get_secret(key).await?;
        let poll = self.ledger().poll(key.poll_id).await?;
        self.drive(
            Transition::Claim,
            &poll,
            key,
            secret.as_ref(),
            signer,
            LedgerCall::Claim { key: *key },
        )
        .await
    }

    /// Buy or extend automation for `voter`.
    pub async fn subscribe(
        &self,
        voter: Address,
        periods: u32,
    ) -> Result<Subscription, ActionError> {
        if periods == 0 {
            return Err(ActionError::GenuineRejection(
                "at least one period required".to_string(),
            ));
        }
        match self
            .executor
            .execute(&voter, &LedgerCall::Subscribe { periods })
            .await
        {
            WriteOutcome::Confirmed(receipt) => {
                count("subscribe", "executed");
                let from_event = receipt.events.iter().find_map(|event| match event {
                    LedgerEvent::Subscribed { voter: v, expiry } if *v == voter => Some(*expiry),
                    _ => None,
                });
                let expiry = match from_event {
                    Some(expiry) => expiry,
                    None => self.ledger().subscription_expiry(&voter).await?,
                };
                info!(voter = %short_address(&voter), expiry, "[cr-04] Subscription extended");
                Ok(Subscription { voter, expiry })
            }
            WriteOutcome::Rejected { reason, .. } => {
                count("subscribe", "rejected");
                Err(ActionError::GenuineRejection(reason))
            }
            WriteOutcome::Unknown { reason, .. } => {
                count("subscribe", "unknown");
                Err(ActionError::TransportFailure(reason))
            }
        }
    }

    /// Current subscription of `voter`.
    pub async fn subscription(&self, voter: Address) -> Result<Subscription, ActionError> {
        let expiry = self.ledger().subscription_expiry(&voter).await?;
        Ok(Subscription { voter, expiry })
    }

    /// Infer the status of `key` with its stored secret and persist a
    /// conclusive answer as a hint.
    pub async fn observe(&self, key: &CommitmentKey) -> Result<StatusInference, ActionError> {
        let secret = self.store.get_secret(key).await?;
        let poll = self.ledger().poll(key.poll_id).await?;
        Ok(self.observe_with_poll(&poll, key, secret.as_ref()).await)
    }

    /// Same as [`observe`](Self::observe) with the poll and secret at hand.
    pub async fn observe_with_poll(
        &self,
        poll: &Poll,
        key: &CommitmentKey,
        secret: Option<&Secret>,
    ) -> StatusInference {
        let inference = self.inference.infer_with_poll(poll, key, secret).await;
        if let Some(secret) = secret {
            self.remember(secret, &inference);
        }
        inference
    }

    async fn drive(
        &self,
        transition: Transition,
        poll: &Poll,
        key: &CommitmentKey,
        secret: Option<&Secret>,
        signer: &Address,
        call: LedgerCall,
    ) -> Result<ActionOutcome, ActionError> {
        let before = self.observe_with_poll(poll, key, secret).await;
        let status = match &before {
            StatusInference::Known { status, .. } => *status,
            StatusInference::Unknown { reason } => {
                let err = ActionError::from_unknown(key, reason);
                if let (ActionError::SecretInvalid(_), Some(secret)) = (&err, secret) {
                    self.flag_invalid(secret);
                }
                return Err(err);
            }
        };

        match authorize(transition, poll.phase(self.clock.now()), Some(status)) {
            Verdict::Proceed => {}
            Verdict::AlreadyDone => {
                log_commitment_event!(
                    info,
                    "cr-04",
                    "[cr-04] Target already reached, nothing submitted",
                    key,
                    %transition,
                    %status
                );
                return Ok(ActionOutcome::AlreadyDone {
                    status: Some(status),
                });
            }
            Verdict::NotYetEligible(why) => return Err(ActionError::NotYetEligible(why.into())),
            Verdict::Refused(why) => {
                if before.is_conclusive() {
                    self.flag_refused(secret);
                }
                return Err(ActionError::GenuineRejection(why.into()));
            }
        }

        match self.executor.execute(signer, &call).await {
            WriteOutcome::Confirmed(receipt) => {
                let reached = target_status(transition);
                if let (Some(secret), Some(reached)) = (secret, reached) {
                    self.persist_hint(secret, reached);
                }
                log_commitment_event!(
                    info,
                    "cr-04",
                    "[cr-04] Write confirmed",
                    key,
                    %transition,
                    signer = %short_address(signer)
                );
                Ok(ActionOutcome::Executed {
                    tx_hash: receipt.tx_hash,
                    status: reached,
                })
            }
            WriteOutcome::Rejected { reason, .. } => {
                self.settle_rejection(transition, key, secret, reason).await
            }
            WriteOutcome::Unknown { reason, .. } => Err(ActionError::TransportFailure(reason)),
        }
    }

    /// A rejected write is ambiguous. Re-infer and decide.
    async fn settle_rejection(
        &self,
        transition: Transition,
        key: &CommitmentKey,
        secret: Option<&Secret>,
        reason: String,
    ) -> Result<ActionOutcome, ActionError> {
        let poll = self
            .ledger()
            .poll(key.poll_id)
            .await
            .map_err(|e| ActionError::Inconclusive(e.to_string()))?;
        let after = self.observe_with_poll(&poll, key, secret).await;

        let Some(status) = after.status() else {
            warn!(%key, %transition, %reason, "[cr-04] Rejected and re-inference inconclusive");
            return Err(ActionError::Inconclusive(reason));
        };
        match authorize(transition, poll.phase(self.clock.now()), Some(status)) {
            Verdict::AlreadyDone => {
                log_commitment_event!(
                    info,
                    "cr-04",
                    "[cr-04] Rejection explained as already done",
                    key,
                    %transition
                );
                Ok(ActionOutcome::AlreadyDone {
                    status: Some(status),
                })
            }
            Verdict::NotYetEligible(why) => Err(ActionError::NotYetEligible(why.into())),
            Verdict::Refused(why) => {
                self.flag_refused(secret);
                Err(ActionError::GenuineRejection(why.into()))
            }
            Verdict::Proceed if after.is_conclusive() => {
                self.flag_refused(secret);
                Err(ActionError::GenuineRejection(reason))
            }
            Verdict::Proceed => Err(ActionError::Inconclusive(reason)),
        }
    }

    fn remember(&self, secret: &Secret, inference: &StatusInference) {
        if !inference.is_conclusive() {
            return;
        }
        if let Some(status) = inference.status() {
            self.persist_hint(secret, status);
        }
    }

    fn persist_hint(&self, secret: &Secret, status: LifecycleStatus) {
        match self.store.record_status(secret, status) {
            Ok(()) => {}
            Err(StoreError::StatusRegression(e)) => {
                error!(key = %secret.key, error = %e, "[cr-04] Inferred status would regress, hint kept");
            }
            Err(e) => warn!(key = %secret.key, error = %e, "[cr-04] Could not persist status hint"),
        }
    }

    fn flag_refused(&self, secret: Option<&Secret>) {
        let Some(secret) = secret else { return };
        if let Err(e) = self.store.mark_refused(secret) {
            warn!(key = %secret.key, error = %e, "[cr-04] Could not flag refused commitment");
        }
    }

    fn flag_invalid(&self, secret: &Secret) {
        if let Err(e) = self.store.mark_invalid(secret) {
            warn!(key = %secret.key, error = %e, "[cr-04] Could not flag invalid secret");
        }
    }
}

fn count(action: &str, outcome: &str) {
    LIFECYCLE_WRITES.with_label_values(&[action, outcome]).inc();
}

fn record(transition: Transition, result: &Result<ActionOutcome, ActionError>) {
    let outcome = match result {
        Ok(outcome) => outcome.label(),
        Err(ActionError::TransportFailure(_)) => "transport_failure",
        Err(ActionError::NotYetEligible(_)) => "not_yet_eligible",
        Err(ActionError::Inconclusive(_)) => "inconclusive",
        Err(_) => "failed",
    };
    count(transition.as_str(), outcome);
}
