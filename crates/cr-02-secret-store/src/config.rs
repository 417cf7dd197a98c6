//! # Secret Store Configuration

use serde::{Deserialize, Serialize};

/// Secret Store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretStoreConfig {
    /// How long a local-only secret is presumed in flight to the backend.
    /// Older unsynced secrets are still pushed, but reported as stale.
    pub grace_window_secs: u64,
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self {
            grace_window_secs: 30,
        }
    }
}

impl SecretStoreConfig {
    /// Create a config for testing.
    pub fn for_testing() -> Self {
        Self {
            grace_window_secs: 5,
        }
    }
}
