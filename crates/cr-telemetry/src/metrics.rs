//! Prometheus metrics for the engine.
//!
//! All metrics follow the naming convention: `cr_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SCHEDULER METRICS
    // =========================================================================

    /// Completed scheduler ticks
    pub static ref SCHEDULER_TICKS: IntCounter = IntCounter::new(
        "cr_scheduler_ticks_total",
        "Total number of completed automation ticks"
    ).expect("metric creation failed");

    /// Tick duration
    pub static ref SCHEDULER_TICK_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "cr_scheduler_tick_duration_seconds",
            "Wall time of one automation tick"
        ).buckets(exponential_buckets(0.01, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // LIFECYCLE METRICS
    // =========================================================================

    /// Lifecycle writes by action and outcome
    pub static ref LIFECYCLE_WRITES: IntCounterVec = IntCounterVec::new(
        Opts::new("cr_lifecycle_writes_total", "Lifecycle writes by action and outcome"),
        &["action", "outcome"]  // action: commit/reveal/resolve/claim/subscribe
    ).expect("metric creation failed");

    /// Statuses concluded from a speculative dry run instead of a direct read
    pub static ref INFERENCE_HEURISTIC: IntCounter = IntCounter::new(
        "cr_inference_heuristic_total",
        "Statuses inferred from a speculative probe"
    ).expect("metric creation failed");

    // =========================================================================
    // SECRET STORE METRICS
    // =========================================================================

    /// Local/backend secret conflicts found during reconciliation
    pub static ref SECRET_CONFLICTS: IntCounter = IntCounter::new(
        "cr_secret_conflicts_total",
        "Secrets whose local and backend copies disagree"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call twice.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SCHEDULER_TICKS.clone()),
        Box::new(SCHEDULER_TICK_DURATION.clone()),
        Box::new(LIFECYCLE_WRITES.clone()),
        Box::new(INFERENCE_HEURISTIC.clone()),
        Box::new(SECRET_CONFLICTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
