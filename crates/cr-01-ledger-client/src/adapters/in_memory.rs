//! # In-Memory Ledger
//!
//! An in-process poll contract with the same observable behavior as the
//! deployed one: phase-gated commit/reveal/resolve/claim, a generic revert
//! reason for every refusal, and an optional revealed probe (older contract
//! versions lack it). Used by the devnet runtime and by tests.
//!
//! ## Fault Injection
//!
//! | Fault | Effect |
//! |-------|--------|
//! | `inject_submit_failures` | `submit` fails in transport, nothing applied |
//! | `drop_confirmations` | write applied, confirmation never arrives |
//! | `inject_read_failures` | reads and dry runs fail in transport |

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    keccak256, Address, Commitment, CommitmentKey, Hash, Poll, PollId, TimeSource, Timestamp,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{
    CallKind, LedgerCall, LedgerError, LedgerEvent, SimulationOutcome, TxHandle, TxReceipt,
    TxStatus,
};
use crate::ports::LedgerClient;

/// Revert reason reported for every refusal, as the deployed contract does.
pub const GENERIC_REVERT: &str = "execution reverted";

/// Length of one purchased subscription period.
pub const DEFAULT_SUBSCRIPTION_PERIOD_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Clone)]
struct CommitEntry {
    hash: Hash,
    revealed_option: Option<u32>,
    claimed: bool,
}

#[derive(Debug, Clone)]
struct PollRecord {
    poll: Poll,
    commitments: HashMap<Address, Vec<CommitEntry>>,
    tallies: Vec<u64>,
}

#[derive(Debug, Default)]
struct LedgerState {
    polls: Vec<PollRecord>,
    subscriptions: HashMap<Address, Timestamp>,
    receipts: HashMap<Hash, TxReceipt>,
    dropped: HashSet<Hash>,
    nonce: u64,
    submissions: HashMap<CallKind, u64>,
    confirmed: HashMap<CallKind, u64>,
}

#[derive(Debug, Default)]
struct FaultPlan {
    submit_failures: Vec<(Option<Address>, u32)>,
    dropped_confirmations: u32,
    read_failures: u32,
}

/// In-process poll contract.
pub struct InMemoryLedger {
    clock: Arc<dyn TimeSource>,
    state: RwLock<LedgerState>,
    faults: Mutex<FaultPlan>,
    operators: RwLock<HashSet<Address>>,
    reveal_probe: bool,
    subscription_period_secs: u64,
}

impl InMemoryLedger {
    /// Create an empty ledger exposing the revealed probe.
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            clock,
            state: RwLock::new(LedgerState::default()),
            faults: Mutex::new(FaultPlan::default()),
            operators: RwLock::new(HashSet::new()),
            reveal_probe: true,
            subscription_period_secs: DEFAULT_SUBSCRIPTION_PERIOD_SECS,
        }
    }

    /// Behave like an older contract without the revealed probe.
    pub fn without_reveal_probe(mut self) -> Self {
        self.reveal_probe = false;
        self
    }

    /// Override the subscription period length.
    pub fn with_subscription_period(mut self, secs: u64) -> Self {
        self.subscription_period_secs = secs;
        self
    }

    /// Allow `operator` to reveal and claim on behalf of voters.
    pub fn authorize_operator(&self, operator: Address) {
        self.operators.write().insert(operator);
    }

    /// Create a poll and return its id.
    pub fn create_poll(
        &self,
        question: &str,
        options: &[&str],
        commit_phase_end: Timestamp,
        reveal_phase_end: Timestamp,
    ) -> PollId {
        let mut state = self.state.write();
        let id = state.polls.len() as PollId;
        state.polls.push(PollRecord {
            poll: Poll {
                id,
                question: question.to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
                commit_phase_end,
                reveal_phase_end,
                resolved: false,
                winning_option: None,
            },
            commitments: HashMap::new(),
            tallies: vec![0; options.len()],
        });
        id
    }

    /// Fail the next `times` submissions in transport. With `Some(voter)`,
    /// only calls acting for `voter` (or signed by it) are affected.
    pub fn inject_submit_failures(&self, voter: Option<Address>, times: u32) {
        self.faults.lock().submit_failures.push((voter, times));
    }

    /// Apply the next `times` writes but never deliver their confirmation.
    pub fn drop_confirmations(&self, times: u32) {
        self.faults.lock().dropped_confirmations += times;
    }

    /// Fail the next `times` reads or dry runs in transport.
    pub fn inject_read_failures(&self, times: u32) {
        self.faults.lock().read_failures += times;
    }

    /// Number of submissions of `kind`, applied or not.
    pub fn submissions(&self, kind: CallKind) -> u64 {
        self.state.read().submissions.get(&kind).copied().unwrap_or(0)
    }

    /// Number of applied writes of `kind`.
    pub fn confirmed_writes(&self, kind: CallKind) -> u64 {
        self.state.read().confirmed.get(&kind).copied().unwrap_or(0)
    }

    /// Synchronous commitment count, for assertions.
    pub fn commitment_count_now(&self, poll_id: PollId, voter: &Address) -> u32 {
        self.state
            .read()
            .polls
            .get(poll_id as usize)
            .and_then(|record| record.commitments.get(voter))
            .map(|entries| entries.len() as u32)
            .unwrap_or(0)
    }

    fn take_read_fault(&self) -> Result<(), LedgerError> {
        let mut faults = self.faults.lock();
        if faults.read_failures > 0 {
            faults.read_failures -= 1;
            return Err(LedgerError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    fn take_submit_fault(&self, signer: &Address, call: &LedgerCall) -> Result<(), LedgerError> {
        let subject = call.subject().unwrap_or(*signer);
        let mut faults = self.faults.lock();
        let hit = faults
            .submit_failures
            .iter_mut()
            .find(|(target, remaining)| {
                *remaining > 0 && target.map_or(true, |voter| voter == subject || voter == *signer)
            });
        if let Some((_, remaining)) = hit {
            *remaining -= 1;
            return Err(LedgerError::Transport("broken pipe".to_string()));
        }
        Ok(())
    }

    fn take_drop_fault(&self) -> bool {
        let mut faults = self.faults.lock();
        if faults.dropped_confirmations > 0 {
            faults.dropped_confirmations -= 1;
            return true;
        }
        false
    }

    fn may_act_for(&self, signer: &Address, voter: &Address) -> bool {
        signer == voter || self.operators.read().contains(signer)
    }

    /// Contract rules. Returns the events a successful call emits.
    fn check(
        &self,
        state: &LedgerState,
        signer: &Address,
        call: &LedgerCall,
        now: Timestamp,
    ) -> Result<Vec<LedgerEvent>, ()> {
        match call {
            LedgerCall::Commit { poll_id, hash } => {
                let record = state.polls.get(*poll_id as usize).ok_or(())?;
                if now >= record.poll.commit_phase_end {
                    return Err(());
                }
                let index = record
                    .commitments
                    .get(signer)
                    .map(|entries| entries.len() as u32)
                    .unwrap_or(0);
                Ok(vec![LedgerEvent::CommitRecorded {
                    key: CommitmentKey::new(*poll_id, *signer, index),
                    hash: *hash,
                }])
            }
            LedgerCall::Reveal { key, option, salt } => {
                let record = state.polls.get(key.poll_id as usize).ok_or(())?;
                if !self.may_act_for(signer, &key.voter)
                    || record.poll.resolved
                    || !record.poll.in_reveal_window(now)
                    || !record.poll.has_option(*option)
                {
                    return Err(());
                }
                let entry = entry(record, key).ok_or(())?;
                if entry.revealed_option.is_some()
                    || entry.hash != shared_types::commitment_hash(*option, salt)
                {
                    return Err(());
                }
                Ok(vec![LedgerEvent::Revealed {
                    key: *key,
                    option: *option,
                }])
            }
            LedgerCall::Resolve { poll_id } => {
                let record = state.polls.get(*poll_id as usize).ok_or(())?;
                if record.poll.resolved || now < record.poll.reveal_phase_end {
                    return Err(());
                }
                Ok(vec![LedgerEvent::Resolved {
                    poll_id: *poll_id,
                    winning_option: plurality(&record.tallies),
                }])
            }
            LedgerCall::Claim { key } => {
                let record = state.polls.get(key.poll_id as usize).ok_or(())?;
                if !self.may_act_for(signer, &key.voter) || !record.poll.resolved {
                    return Err(());
                }
                let entry = entry(record, key).ok_or(())?;
                if entry.claimed || entry.revealed_option != record.poll.winning_option {
                    return Err(());
                }
                Ok(vec![LedgerEvent::Claimed { key: *key }])
            }
            LedgerCall::Subscribe { periods } => {
                if *periods == 0 {
                    return Err(());
                }
                let current = state.subscriptions.get(signer).copied().unwrap_or(0);
                let expiry = current.max(now) + self.subscription_period_secs * *periods as u64;
                Ok(vec![LedgerEvent::Subscribed {
                    voter: *signer,
                    expiry,
                }])
            }
        }
    }

    fn apply(state: &mut LedgerState, events: &[LedgerEvent]) {
        for event in events {
            match event {
                LedgerEvent::CommitRecorded { key, hash } => {
                    if let Some(record) = state.polls.get_mut(key.poll_id as usize) {
                        record.commitments.entry(key.voter).or_default().push(CommitEntry {
                            hash: *hash,
                            revealed_option: None,
                            claimed: false,
                        });
                    }
                }
                LedgerEvent::Revealed { key, option } => {
                    if let Some(record) = state.polls.get_mut(key.poll_id as usize) {
                        if let Some(tally) = record.tallies.get_mut(*option as usize) {
                            *tally += 1;
                        }
                        if let Some(entry) = entry_mut(record, key) {
                            entry.revealed_option = Some(*option);
                        }
                    }
                }
                LedgerEvent::Resolved {
                    poll_id,
                    winning_option,
                } => {
                    if let Some(record) = state.polls.get_mut(*poll_id as usize) {
                        record.poll.resolved = true;
                        record.poll.winning_option = Some(*winning_option);
                    }
                }
                LedgerEvent::Claimed { key } => {
                    if let Some(record) = state.polls.get_mut(key.poll_id as usize) {
                        if let Some(entry) = entry_mut(record, key) {
                            entry.claimed = true;
                        }
                    }
                }
                LedgerEvent::Subscribed { voter, expiry } => {
                    state.subscriptions.insert(*voter, *expiry);
                }
            }
        }
    }

    fn record(&self, poll_id: PollId) -> Result<PollRecord, LedgerError> {
        self.state
            .read()
            .polls
            .get(poll_id as usize)
            .cloned()
            .ok_or(LedgerError::PollNotFound(poll_id))
    }
}

fn entry<'a>(record: &'a PollRecord, key: &CommitmentKey) -> Option<&'a CommitEntry> {
    record
        .commitments
        .get(&key.voter)
        .and_then(|entries| entries.get(key.index as usize))
}

fn entry_mut<'a>(record: &'a mut PollRecord, key: &CommitmentKey) -> Option<&'a mut CommitEntry> {
    record
        .commitments
        .get_mut(&key.voter)
        .and_then(|entries| entries.get_mut(key.index as usize))
}

/// Option with the most reveals; ties go to the lowest index.
fn plurality(tallies: &[u64]) -> u32 {
    let mut best = 0usize;
    for (i, tally) in tallies.iter().enumerate() {
        if *tally > tallies[best] {
            best = i;
        }
    }
    best as u32
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn poll_count(&self) -> Result<u64, LedgerError> {
        self.take_read_fault()?;
        Ok(self.state.read().polls.len() as u64)
    }

    async fn poll(&self, poll_id: PollId) -> Result<Poll, LedgerError> {
        self.take_read_fault()?;
        Ok(self.record(poll_id)?.poll)
    }

    async fn commitment(&self, key: &CommitmentKey) -> Result<Option<Commitment>, LedgerError> {
        self.take_read_fault()?;
        let record = self.record(key.poll_id)?;
        Ok(entry(&record, key).map(|e| Commitment {
            key: *key,
            committed_hash: e.hash,
        }))
    }

    async fn commitment_count(&self, poll_id: PollId, voter: &Address) -> Result<u32, LedgerError> {
        self.take_read_fault()?;
        self.record(poll_id)?;
        Ok(self.commitment_count_now(poll_id, voter))
    }

    async fn has_revealed(&self, key: &CommitmentKey) -> Result<Option<bool>, LedgerError> {
        self.take_read_fault()?;
        if !self.reveal_probe {
            return Ok(None);
        }
        let record = self.record(key.poll_id)?;
        Ok(Some(
            entry(&record, key).map_or(false, |e| e.revealed_option.is_some()),
        ))
    }

    async fn has_claimed(&self, key: &CommitmentKey) -> Result<bool, LedgerError> {
        self.take_read_fault()?;
        let record = self.record(key.poll_id)?;
        Ok(entry(&record, key).map_or(false, |e| e.claimed))
    }

    async fn subscription_expiry(&self, voter: &Address) -> Result<Timestamp, LedgerError> {
        self.take_read_fault()?;
        Ok(self.state.read().subscriptions.get(voter).copied().unwrap_or(0))
    }

    async fn simulate(
        &self,
        signer: &Address,
        call: &LedgerCall,
    ) -> Result<SimulationOutcome, LedgerError> {
        self.take_read_fault()?;
        let now = self.clock.now();
        let state = self.state.read();
        Ok(match self.check(&state, signer, call, now) {
            Ok(_) => SimulationOutcome::WouldSucceed,
            Err(()) => SimulationOutcome::WouldRevert {
                reason: GENERIC_REVERT.to_string(),
            },
        })
    }

    async fn submit(&self, signer: &Address, call: &LedgerCall) -> Result<TxHandle, LedgerError> {
        self.take_submit_fault(signer, call)?;
        let now = self.clock.now();
        let dropped = self.take_drop_fault();

        let mut state = self.state.write();
        state.nonce += 1;
        *state.submissions.entry(call.kind()).or_default() += 1;

        let mut preimage = state.nonce.to_be_bytes().to_vec();
        preimage.extend_from_slice(signer);
        let tx_hash = keccak256(&preimage);

        let receipt = match self.check(&state, signer, call, now) {
            Ok(events) => {
                Self::apply(&mut state, &events);
                *state.confirmed.entry(call.kind()).or_default() += 1;
                TxReceipt {
                    tx_hash,
                    status: TxStatus::Confirmed,
                    events,
                }
            }
            Err(()) => TxReceipt {
                tx_hash,
                status: TxStatus::Reverted {
                    reason: GENERIC_REVERT.to_string(),
                },
                events: Vec::new(),
            },
        };
        state.receipts.insert(tx_hash, receipt);
        if dropped {
            state.dropped.insert(tx_hash);
        }

        Ok(TxHandle {
            tx_hash,
            kind: call.kind(),
            signer: *signer,
        })
    }

    async fn await_confirmation(&self, handle: &TxHandle) -> Result<TxReceipt, LedgerError> {
        let (receipt, dropped) = {
            let state = self.state.read();
            (
                state.receipts.get(&handle.tx_hash).cloned(),
                state.dropped.contains(&handle.tx_hash),
            )
        };
        if dropped {
            std::future::pending::<()>().await;
        }
        receipt.ok_or_else(|| {
            let prefix = handle.tx_hash[..4]
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect();
            LedgerError::UnknownTransaction(prefix)
        })
    }
}
