//! # Engine Telemetry
//!
//! Structured logging and Prometheus metrics for the reconciliation engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cr_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | unset | Full filter directive, wins over `CR_LOG_LEVEL` |
//! | `CR_LOG_LEVEL` | `info` | Log level filter |
//! | `CR_JSON_LOGS` | `false` | JSON lines instead of pretty output |
//! | `CR_SERVICE_NAME` | `cr-engine` | Service name attached to startup logs |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, INFERENCE_HEURISTIC, LIFECYCLE_WRITES,
    SCHEDULER_TICKS, SCHEDULER_TICK_DURATION, SECRET_CONFLICTS,
};

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A metric could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and register metrics.
///
/// Returns a guard that should be held for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    logging::init_logging(&config)?;
    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "[telemetry] Initialized"
    );
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Keeps telemetry alive. Dropping it logs the shutdown.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "[telemetry] Shutting down");
    }
}

/// Structured log line with a `subsystem` field.
///
/// ```rust,ignore
/// log_event!(info, "cr-05", "Tick finished", reveals = 3);
/// ```
#[macro_export]
macro_rules! log_event {
    ($level:ident, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log line about one commitment. `$key` needs `poll_id` and `index` fields
/// and a `Display` impl.
#[macro_export]
macro_rules! log_commitment_event {
    ($level:ident, $subsystem:expr, $msg:expr, $key:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            poll_id = $key.poll_id,
            index = $key.index,
            commitment = %$key,
            $($($field)*,)?
            $msg
        )
    };
}

/// Increment a counter, optionally labelled.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
