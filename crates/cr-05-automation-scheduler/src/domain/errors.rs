//! # Domain Errors

use cr_01_ledger_client::LedgerError;
use thiserror::Error;

/// Why a whole tick did not run. Per-commitment failures never end up here;
/// they are isolated in the tick report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The previous tick still holds the lease.
    #[error("Previous tick still in flight")]
    TickInFlight,

    /// The poll count could not be read, so there is nothing to enumerate.
    #[error("Cannot enumerate polls: {0}")]
    Enumeration(#[from] LedgerError),
}
