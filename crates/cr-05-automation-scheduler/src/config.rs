//! # Scheduler Configuration

use serde::{Deserialize, Serialize};
use shared_types::Address;
use std::time::Duration;

/// Automation scheduler configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between ticks.
    pub tick_interval_secs: u64,
    /// Pause between two writes of one sweep, to stay under ledger-side rate
    /// limits.
    pub inter_call_delay_ms: u64,
    /// Identity automated writes are signed with. Must be authorized by the
    /// ledger to act for subscribed voters.
    pub operator: Address,
    /// Run the reconciliation routine for watched voters every N ticks
    /// (0 disables it).
    pub reconcile_every_ticks: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            inter_call_delay_ms: 250,
            operator: [0u8; 20],
            reconcile_every_ticks: 10,
        }
    }
}

impl SchedulerConfig {
    /// Create a config for testing (no delays).
    pub fn for_testing(operator: Address) -> Self {
        Self {
            tick_interval_secs: 1,
            inter_call_delay_ms: 0,
            operator,
            reconcile_every_ticks: 1,
        }
    }

    /// Tick interval as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Inter-call delay as a `Duration`.
    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.inter_call_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(60));
        assert_eq!(config.inter_call_delay(), Duration::from_millis(250));
    }
}
