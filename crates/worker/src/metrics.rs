//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the preprocessing worker:
//! - HTTP request metrics (latency, counts)
//! - Session usage (collected dynamically)
//! - Core workflow and activity metrics

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

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
            "preprocessing_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 300.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("preprocessing_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "preprocessing_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Session Metrics
// =============================================================================

/// Runs currently holding a session.
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "preprocessing_sessions_active",
        "Number of workflow runs currently executing",
    )
    .unwrap()
});

/// Configured session limit.
pub static SESSIONS_MAX: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "preprocessing_sessions_max",
        "Maximum number of concurrently executing workflow runs",
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

    // Sessions
    registry
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .unwrap();
    registry.register(Box::new(SESSIONS_MAX.clone())).unwrap();

    // Core metrics (runs, activities)
    for metric in preprocessing_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Update gauges from the current worker state before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.worker().status();
    SESSIONS_ACTIVE.set(status.active_sessions as i64);
    SESSIONS_MAX.set(status.max_sessions as i64);
}

/// Normalize a path for metric labels (replace run ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    let runs_regex = regex_lite::Regex::new(r"/runs/[^/]+").unwrap();
    let workflows_regex = regex_lite::Regex::new(r"/workflows/[^/]+").unwrap();

    let result = runs_regex.replace_all(path, "/runs/{run_id}");
    let result = workflows_regex.replace_all(&result, "/workflows/{name}");
    result.to_string()
}
