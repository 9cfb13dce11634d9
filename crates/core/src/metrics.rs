//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Workflow runs (outcomes, rejected inputs, durations)
//! - Activity calls made through the local runtime

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Workflow runs
// =============================================================================

/// Completed runs by outcome.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("preprocessing_runs_total", "Total completed workflow runs"),
        &["outcome"], // "success", "system_error", "content_error"
    )
    .unwrap()
});

/// Runs rejected because of malformed parameters.
pub static RUNS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "preprocessing_runs_rejected_total",
        "Total runs rejected with a non-retryable input error",
    )
    .unwrap()
});

/// Runs served entirely from recorded history.
pub static RUNS_REPLAYED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "preprocessing_runs_replayed_total",
        "Total runs resumed from recorded history",
    )
    .unwrap()
});

/// Run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "preprocessing_run_duration_seconds",
            "Duration of workflow runs",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Activities
// =============================================================================

/// Activity call duration in seconds.
pub static ACTIVITY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "preprocessing_activity_duration_seconds",
            "Duration of activity calls",
        )
        .buckets(vec![0.05, 0.25, 1.0, 5.0, 15.0, 60.0, 120.0, 300.0]),
        &["activity", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Activity attempts total.
pub static ACTIVITY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "preprocessing_activity_attempts_total",
            "Total activity attempts, retries included",
        ),
        &["activity"],
    )
    .unwrap()
});

/// Activity timeouts total.
pub static ACTIVITY_TIMEOUTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "preprocessing_activity_timeouts_total",
            "Total activity calls that hit their schedule-to-close timeout",
        ),
        &["activity"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runs
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUNS_REJECTED.clone()),
        Box::new(RUNS_REPLAYED.clone()),
        Box::new(RUN_DURATION.clone()),
        // Activities
        Box::new(ACTIVITY_DURATION.clone()),
        Box::new(ACTIVITY_ATTEMPTS.clone()),
        Box::new(ACTIVITY_TIMEOUTS.clone()),
    ]
}
