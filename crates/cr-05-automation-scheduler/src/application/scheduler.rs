//! # Automation Scheduler
//!
//! Periodic sweep over every poll:
//!
//! | Phase | Action |
//! |-------|--------|
//! | Commit | nothing |
//! | Reveal | reveal subscribed voters' unrevealed commitments |
//! | AwaitingResolution | resolve once |
//! | Resolved | claim for subscribed voters' winning commitments |
//!
//! Writes go out one at a time with a pause between them, signed by the
//! operator identity. A failure is recorded against its commitment and the
//! sweep moves on; the next tick retries it.
//!
//! At most one tick runs at a time. The [`TickLease`] guard is dropped on
//! every exit path, cancellation at shutdown included.

use cr_01_ledger_client::LedgerClient;
use cr_02_secret_store::SecretRecord;
use cr_04_commitment_lifecycle::{ActionError, ActionOutcome, LifecycleService, Transition};
use cr_telemetry::{log_event, metric_inc, HistogramTimer, SCHEDULER_TICKS, SCHEDULER_TICK_DURATION};
use parking_lot::RwLock;
use shared_types::{short_address, Address, Poll, PollPhase, Subscription, TimeSource, Timestamp};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::ReconciliationRoutine;
use crate::config::SchedulerConfig;
use crate::domain::{SchedulerError, Target, TickLease, TickReport};

/// Drives reveal, resolve and claim for subscribed voters.
pub struct AutomationScheduler {
    lifecycle: Arc<LifecycleService>,
    reconciler: ReconciliationRoutine,
    clock: Arc<dyn TimeSource>,
    config: SchedulerConfig,
    lease: TickLease,
    ticks: AtomicU64,
    watched: RwLock<BTreeSet<Address>>,
}

impl AutomationScheduler {
    /// Create a scheduler.
    pub fn new(
        lifecycle: Arc<LifecycleService>,
        clock: Arc<dyn TimeSource>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            reconciler: ReconciliationRoutine::new(lifecycle.clone(), clock.clone()),
            lifecycle,
            clock,
            config,
            lease: TickLease::new(),
            ticks: AtomicU64::new(0),
            watched: RwLock::new(BTreeSet::new()),
        }
    }

    /// The single-flight lease.
    pub fn lease(&self) -> &TickLease {
        &self.lease
    }

    /// The reconciliation routine, for attach-time use.
    pub fn reconciler(&self) -> &ReconciliationRoutine {
        &self.reconciler
    }

    /// Ticks started so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Include `voter` in periodic reconciliation.
    pub fn watch_voter(&self, voter: Address) {
        self.watched.write().insert(voter);
    }

    /// Voters reconciled periodically.
    pub fn watched_voters(&self) -> Vec<Address> {
        self.watched.read().iter().copied().collect()
    }

    /// Tick until `shutdown` flips. A tick in flight at shutdown is
    /// abandoned; its lease is released with it.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_secs = self.config.tick_interval_secs,
            operator = %short_address(&self.config.operator),
            "[cr-05] Automation scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    tokio::select! {
                        result = self.run_tick() => match result {
                            Ok(_) => {}
                            Err(SchedulerError::TickInFlight) => {
                                debug!("[cr-05] Previous tick still running, skipped");
                            }
                            Err(e) => warn!(error = %e, "[cr-05] Tick failed"),
                        },
                        _ = shutdown.changed() => {
                            info!("[cr-05] Shutdown signal received, abandoning tick");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("[cr-05] Shutdown signal received");
                    break;
                }
            }
        }
    }

    /// Run one tick now.
    pub async fn run_tick(&self) -> Result<TickReport, SchedulerError> {
        let _guard = self.lease.try_acquire().ok_or(SchedulerError::TickInFlight)?;
        let _timer = HistogramTimer::new(&SCHEDULER_TICK_DURATION);

        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.clock.now();
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        let mut sweep = Sweep {
            entitlements: Entitlements::new(self.lifecycle.ledger().clone(), now),
            pacer: Pacer::new(self.config.inter_call_delay()),
        };

        let poll_count = self.lifecycle.ledger().poll_count().await?;
        for poll_id in 0..poll_count {
            report.polls_scanned += 1;
            let poll = match self.lifecycle.ledger().poll(poll_id).await {
                Ok(poll) => poll,
                Err(e) => {
                    warn!(poll_id, error = %e, "[cr-05] Poll read failed, skipped this tick");
                    report.poll_failures.push((poll_id, e.to_string()));
                    continue;
                }
            };
            self.mirror(&poll).await;

            match poll.phase(now) {
                PollPhase::Commit => {}
                PollPhase::Reveal => {
                    self.sweep(Transition::Reveal, &poll, &mut sweep, &mut report)
                        .await
                }
                PollPhase::AwaitingResolution => {
                    sweep.pacer.wait().await;
                    let result = self.lifecycle.resolve(poll_id, &self.config.operator).await;
                    log_result(Transition::Resolve, &Target::Poll(poll_id), &result);
                    report.push(Transition::Resolve, Target::Poll(poll_id), result);
                }
                PollPhase::Resolved => {
                    self.sweep(Transition::Claim, &poll, &mut sweep, &mut report)
                        .await
                }
            }
        }

        if self.reconcile_due(tick) {
            report.reconciled = self.reconcile_watched().await;
        }

        metric_inc!(SCHEDULER_TICKS);
        info!(
            tick,
            polls = report.polls_scanned,
            executed = report.executed(),
            already_done = report.already_done(),
            failed = report.failures().count(),
            "[cr-05] Tick complete"
        );
        Ok(report)
    }

    async fn sweep(
        &self,
        transition: Transition,
        poll: &Poll,
        sweep: &mut Sweep,
        report: &mut TickReport,
    ) {
        let records = match self.lifecycle.store().list_for_poll(poll.id).await {
            Ok(records) => records,
            Err(e) => {
                warn!(poll_id = poll.id, error = %e, "[cr-05] Secrets unavailable, poll skipped");
                report.poll_failures.push((poll.id, e.to_string()));
                return;
            }
        };

        for record in records.iter().filter(|r| is_due(transition, poll, r)) {
            let key = record.key();
            if !sweep.entitlements.is_active(&key.voter).await {
                continue;
            }
            sweep.pacer.wait().await;
            let operator = &self.config.operator;
            let result = match transition {
                Transition::Reveal => self.lifecycle.reveal(&key, operator).await,
                _ => self.lifecycle.claim(&key, operator).await,
            };
            log_result(transition, &Target::Commitment(key), &result);
            report.push(transition, Target::Commitment(key), result);
        }
    }

    /// Best effort; the mirror only feeds listings.
    async fn mirror(&self, poll: &Poll) {
        if let Err(e) = self.lifecycle.store().backend().upsert_poll(poll.clone()).await {
            debug!(poll_id = poll.id, error = %e, "[cr-05] Poll mirror update failed");
        }
    }

    fn reconcile_due(&self, tick: u64) -> bool {
        let every = self.config.reconcile_every_ticks;
        every > 0 && tick % every == 0
    }

    async fn reconcile_watched(&self) -> usize {
        let mut reconciled = 0;
        for voter in self.watched_voters() {
            match self.reconciler.attach(&voter).await {
                Ok(_) => reconciled += 1,
                Err(e) => {
                    warn!(voter = %short_address(&voter), error = %e, "[cr-05] Periodic reconciliation failed")
                }
            }
        }
        reconciled
    }
}

/// Per-tick state shared by every sweep.
struct Sweep {
    entitlements: Entitlements,
    pacer: Pacer,
}

/// Subscription lookups, cached for the duration of one tick.
struct Entitlements {
    ledger: Arc<dyn LedgerClient>,
    now: Timestamp,
    known: HashMap<Address, bool>,
}

impl Entitlements {
    fn new(ledger: Arc<dyn LedgerClient>, now: Timestamp) -> Self {
        Self {
            ledger,
            now,
            known: HashMap::new(),
        }
    }

    async fn is_active(&mut self, voter: &Address) -> bool {
        if let Some(active) = self.known.get(voter) {
            return *active;
        }
        let active = match self.ledger.subscription_expiry(voter).await {
            Ok(expiry) => Subscription {
                voter: *voter,
                expiry,
            }
            .is_active(self.now),
            Err(e) => {
                warn!(voter = %short_address(voter), error = %e, "[cr-05] Subscription unreadable, voter skipped");
                false
            }
        };
        self.known.insert(*voter, active);
        active
    }
}

/// Spaces out writes within a tick.
struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

fn is_due(transition: Transition, poll: &Poll, record: &SecretRecord) -> bool {
    match transition {
        Transition::Reveal => record.needs_reveal(),
        Transition::Claim => record.needs_claim() && poll.winner() == Some(record.secret.option),
        Transition::Resolve => false,
    }
}

fn log_result(
    transition: Transition,
    target: &Target,
    result: &Result<ActionOutcome, ActionError>,
) {
    match result {
        Ok(outcome) if outcome.is_executed() => {
            log_event!(info, "cr-05", "[cr-05] Automated write confirmed", %transition, %target)
        }
        Ok(_) => debug!(%transition, %target, "[cr-05] Already done"),
        Err(e) if e.is_retryable() => log_event!(
            warn,
            "cr-05",
            "[cr-05] Automated write failed, retrying next tick",
            %transition,
            %target,
            error = %e
        ),
        Err(e) => log_event!(
            warn,
            "cr-05",
            "[cr-05] Automated write refused",
            %transition,
            %target,
            error = %e
        ),
    }
}
