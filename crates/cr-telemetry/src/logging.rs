//! Subscriber installation.
//!
//! `RUST_LOG` wins when set; otherwise `log_level` is used as the filter
//! directive. Output is pretty for terminals and JSON for containers.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global subscriber.
pub(crate) fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(config)?;

    if config.json_logs {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
    } else {
        let pretty_layer = fmt::layer().with_target(true).with_thread_ids(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(pretty_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
    }
}

fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_directives() {
        let config = TelemetryConfig {
            log_level: "cr_05_automation_scheduler=debug,info".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(build_filter(&config).is_ok());
    }
}
