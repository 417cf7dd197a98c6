//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full directive
    pub log_level: String,

    /// Whether to emit JSON lines
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "cr-engine".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CR_SERVICE_NAME`: Service name (default: cr-engine)
    /// - `CR_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `CR_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("CR_SERVICE_NAME").unwrap_or_else(|_| "cr-engine".to_string()),

            log_level: env::var("CR_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("CR_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),
        }
    }

    /// Quiet configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            log_level: "warn".to_string(),
            ..Self::default()
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
