//! # Ledger Client Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ledger client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerClientConfig {
    /// Bounded wait for a write's confirmation, in milliseconds. On expiry the
    /// write's outcome is unknown, never failed.
    pub confirmation_timeout_ms: u64,
}

impl Default for LedgerClientConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_ms: 30_000,
        }
    }
}

impl LedgerClientConfig {
    /// Create a config for testing (short waits).
    pub fn for_testing() -> Self {
        Self {
            confirmation_timeout_ms: 50,
        }
    }

    /// Confirmation timeout as a `Duration`.
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}
