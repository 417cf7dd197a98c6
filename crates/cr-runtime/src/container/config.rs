//! # Runtime Configuration
//!
//! Aggregates every subsystem's configuration and loads overrides from the
//! environment.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CR_TICK_INTERVAL_SECS` | `scheduler.tick_interval_secs` |
//! | `CR_INTER_CALL_DELAY_MS` | `scheduler.inter_call_delay_ms` |
//! | `CR_RECONCILE_EVERY_TICKS` | `scheduler.reconcile_every_ticks` |
//! | `CR_OPERATOR_ADDRESS` | `scheduler.operator` (40 hex chars) |
//! | `CR_CONFIRMATION_TIMEOUT_SECS` | `ledger.confirmation_timeout_ms` |
//! | `CR_GRACE_WINDOW_SECS` | `store.grace_window_secs` |
//! | `CR_LOCAL_CACHE_PATH` | `local_cache_path` (unset: in-memory cache) |

use cr_01_ledger_client::LedgerClientConfig;
use cr_02_secret_store::SecretStoreConfig;
use cr_05_automation_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use shared_types::Address;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Ledger client configuration.
    pub ledger: LedgerClientConfig,
    /// Secret Store configuration.
    pub store: SecretStoreConfig,
    /// Scheduler configuration.
    pub scheduler: SchedulerConfig,
    /// File backing the local secret cache.
    pub local_cache_path: Option<PathBuf>,
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{var} is invalid: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The operator identity is the zero address.
    #[error("Operator address not set. Set CR_OPERATOR_ADDRESS.")]
    MissingOperator,

    /// A duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load with `lookup` standing in for the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_u64(&lookup, "CR_TICK_INTERVAL_SECS")? {
            config.scheduler.tick_interval_secs = secs;
        }
        if let Some(ms) = parse_u64(&lookup, "CR_INTER_CALL_DELAY_MS")? {
            config.scheduler.inter_call_delay_ms = ms;
        }
        if let Some(every) = parse_u64(&lookup, "CR_RECONCILE_EVERY_TICKS")? {
            config.scheduler.reconcile_every_ticks = every;
        }
        if let Some(secs) = parse_u64(&lookup, "CR_CONFIRMATION_TIMEOUT_SECS")? {
            config.ledger.confirmation_timeout_ms = secs.saturating_mul(1_000);
        }
        if let Some(secs) = parse_u64(&lookup, "CR_GRACE_WINDOW_SECS")? {
            config.store.grace_window_secs = secs;
        }
        if let Some(raw) = lookup("CR_OPERATOR_ADDRESS") {
            config.scheduler.operator = parse_address(&raw)?;
        }
        if let Some(path) = lookup("CR_LOCAL_CACHE_PATH").filter(|p| !p.is_empty()) {
            config.local_cache_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Check the configuration can run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration("CR_TICK_INTERVAL_SECS"));
        }
        if self.ledger.confirmation_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("CR_CONFIRMATION_TIMEOUT_SECS"));
        }
        if self.scheduler.operator == [0u8; 20] {
            return Err(ConfigError::MissingOperator);
        }
        if self.local_cache_path.is_none() {
            warn!("[runtime] CR_LOCAL_CACHE_PATH not set, secrets held in memory only");
        }
        Ok(())
    }
}

fn parse_u64<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }),
    }
}

fn parse_address(raw: &str) -> Result<Address, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "CR_OPERATOR_ADDRESS",
        reason,
    };
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|e| invalid(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| invalid(format!("expected 20 bytes, got {}", bytes.len())))
}
