//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the episodic server:
//! - HTTP request metrics (latency, counts)
//! - Orchestrator state and tracked episodes (collected dynamically)
//!
//! Pass and lifecycle counters live in `episodic_core::metrics` and are
//! registered into the same registry.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

use episodic_core::{EpisodeFilter, EpisodeStatus, EpisodeStore};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "episodic_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("episodic_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "episodic_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Orchestrator running state (1 = running, 0 = stopped).
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "episodic_orchestrator_running",
        "Whether the orchestrator is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Tracked episodes by status.
pub static EPISODES_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("episodic_episodes_by_status", "Tracked episodes by status"),
        &["status"],
    )
    .unwrap()
});

/// Shows whose configuration failed to resolve.
pub static INVALID_SHOWS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "episodic_invalid_shows",
        "Configured shows that failed validation",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Orchestrator
    registry
        .register(Box::new(ORCHESTRATOR_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(EPISODES_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(INVALID_SHOWS.clone())).unwrap();

    // Core metrics (discovery, lifecycle, passes)
    for metric in episodic_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the store and the
/// orchestrator at scrape time.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    ORCHESTRATOR_RUNNING.set(i64::from(state.orchestrator().is_running()));
    INVALID_SHOWS.set(state.shows().invalid().count() as i64);

    for status in EpisodeStatus::ALL {
        let filter = EpisodeFilter::new().with_status(status).with_limit(i64::MAX);
        if let Ok(count) = state.store().count(&filter) {
            EPISODES_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count);
        }
    }
}

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static SHOW_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/shows/[^/]+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs and show keys with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_SEGMENT.replace_all(path, "{id}");
    SHOW_SEGMENT
        .replace_all(&result, "/shows/{key}$1")
        .into_owned()
}
