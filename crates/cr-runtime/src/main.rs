//! # Engine Runtime
//!
//! Starts the reconciliation engine:
//!
//! 1. Telemetry (logging and metrics registry)
//! 2. Configuration from the environment, validated
//! 3. Subsystem wiring
//! 4. Automation scheduler until Ctrl+C

use anyhow::{Context, Result};
use cr_runtime::{EngineContainer, RuntimeConfig};
use cr_telemetry::{encode_metrics, init_telemetry, register_metrics, TelemetryConfig};
use shared_types::SystemTimeSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long a stopping scheduler may take to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;
    register_metrics()?;

    let config = RuntimeConfig::from_env().context("loading configuration")?;
    config.validate().context("validating configuration")?;
    info!(
        version = cr_runtime::VERSION,
        tick_secs = config.scheduler.tick_interval_secs,
        "[runtime] Configuration loaded"
    );

    let engine = EngineContainer::devnet(&config, Arc::new(SystemTimeSource))
        .context("wiring engine")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = engine.scheduler.clone();
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    info!("[runtime] Engine is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("[runtime] Shutting down");
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
        Ok(Ok(())) => info!("[runtime] Scheduler stopped"),
        Ok(Err(e)) => warn!(error = %e, "[runtime] Scheduler task ended abnormally"),
        Err(_) => warn!("[runtime] Scheduler did not stop in time"),
    }

    if let Ok(metrics) = encode_metrics() {
        debug!(%metrics, "[runtime] Final metrics");
    }
    Ok(())
}
