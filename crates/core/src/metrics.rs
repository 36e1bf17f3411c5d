//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Sessions (live registry entries)
//! - Jobs (submissions, outcomes, durations)
//! - Normalization fallbacks

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Session Metrics
// =============================================================================

/// Sessions currently present in the registry.
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubecast_sessions_active",
        "Number of conversion sessions currently registered",
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Submissions accepted and launched.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("tubecast_jobs_submitted_total", "Total jobs launched").unwrap()
});

/// Submissions rejected by URL validation.
pub static JOBS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubecast_jobs_rejected_total",
        "Total submissions rejected before a job was created",
    )
    .unwrap()
});

/// Finished jobs by outcome.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubecast_jobs_finished_total", "Total finished jobs"),
        &["outcome"], // "success", "preflight", "subprocess", "publish"
    )
    .unwrap()
});

/// Job wall-clock duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tubecast_job_duration_seconds",
            "Duration of a conversion job from launch to cleanup",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Normalization passes that failed and fell back to the plain encode.
pub static NORMALIZE_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubecast_normalize_fallbacks_total",
        "Normalization failures that fell back to the un-normalized file",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sessions
        Box::new(SESSIONS_ACTIVE.clone()),
        // Jobs
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_REJECTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(NORMALIZE_FALLBACKS.clone()),
    ]
}
