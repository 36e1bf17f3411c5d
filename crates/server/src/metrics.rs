//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the tubecast server:
//! - HTTP request metrics (latency, counts)
//! - Progress stream connection metrics
//! - Core job and session metrics (registered from `tubecast_core::metrics`)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;
use tracing::error;

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
            "tubecast_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubecast_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubecast_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Progress Stream Metrics
// =============================================================================

/// Open progress streams.
pub static PROGRESS_STREAMS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubecast_progress_streams_active",
        "Number of open progress event streams",
    )
    .unwrap()
});

/// Total progress streams (cumulative).
pub static PROGRESS_STREAMS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubecast_progress_streams_total",
        "Total progress event streams since startup",
    )
    .unwrap()
});

/// Progress events sent by kind.
pub static PROGRESS_EVENTS_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubecast_progress_events_sent_total",
            "Progress events written to streams",
        ),
        &["kind"], // "info", "error", "complete"
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

    // Progress streams
    registry
        .register(Box::new(PROGRESS_STREAMS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(PROGRESS_STREAMS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(PROGRESS_EVENTS_SENT.clone()))
        .unwrap();

    // Core metrics (sessions, jobs)
    for metric in tubecast_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[^/]+\.[mM][pP]3$").unwrap());

/// Normalize a path for metric labels (replace IDs and file names with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = FILE_RE.replace(&result, "/{file}");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/progress/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/progress/{id}");
    }

    #[test]
    fn test_normalize_path_file() {
        assert_eq!(
            normalize_path("/mp3s/Some Talk_20240309_140507.mp3"),
            "/mp3s/{file}"
        );
        assert_eq!(
            normalize_path("/api/v1/episodes/LOUD.MP3"),
            "/api/v1/episodes/{file}"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("tubecast_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Vec metrics only show up once a label set has been touched.
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        PROGRESS_EVENTS_SENT.with_label_values(&["info"]).inc();
        tubecast_core::metrics::JOBS_FINISHED
            .with_label_values(&["success"])
            .inc_by(0);
        tubecast_core::metrics::JOB_DURATION
            .with_label_values(&["success"])
            .observe(1.0);

        let output = encode_metrics();

        assert!(output.contains("tubecast_http_request_duration_seconds"));
        assert!(output.contains("tubecast_http_requests_in_flight"));
        assert!(output.contains("tubecast_progress_streams_active"));
        assert!(output.contains("tubecast_progress_streams_total"));
        assert!(output.contains("tubecast_progress_events_sent_total"));
        assert!(output.contains("tubecast_sessions_active"));
        assert!(output.contains("tubecast_jobs_submitted_total"));
        assert!(output.contains("tubecast_jobs_finished_total"));
        assert!(output.contains("tubecast_job_duration_seconds"));
    }
}
