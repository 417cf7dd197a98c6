//! # Tick Lease
//!
//! Single-flight guard for scheduler ticks. Holding a [`TickGuard`] is the
//! only way to run a tick, and the lease is released when the guard drops:
//! on completion, on early return, on panic, or when the tick future is
//! cancelled at shutdown. Nothing has to remember to clear it.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shared lease. Clones refer to the same slot.
#[derive(Clone, Default)]
pub struct TickLease {
    slot: Arc<Mutex<()>>,
}

/// Proof that the holder owns the current tick.
pub struct TickGuard {
    _held: OwnedMutexGuard<()>,
}

impl TickLease {
    /// Create a free lease.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease, or `None` while another tick holds it.
    pub fn try_acquire(&self) -> Option<TickGuard> {
        Arc::clone(&self.slot)
            .try_lock_owned()
            .ok()
            .map(|held| TickGuard { _held: held })
    }

    /// Whether a tick is in flight.
    pub fn is_held(&self) -> bool {
        self.slot.try_lock().is_err()
    }
}
