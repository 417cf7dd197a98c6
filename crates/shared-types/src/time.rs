//! Time source abstraction.
//!
//! Phase and subscription checks compare against ledger timestamps in unix
//! seconds. Abstracted to allow testing with deterministic time.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::entities::Timestamp;

/// Source of the current time in unix seconds.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually driven time source for tests and simulations.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    time: AtomicU64,
}

impl MockTimeSource {
    /// Start at `initial`.
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to `time`.
    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}
