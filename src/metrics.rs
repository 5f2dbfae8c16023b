/// Metrics and telemetry
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Report creation and voting
/// - Auto-moderation and retention sweep deletions
/// - Classification outcomes and background jobs

use crate::error::{AlertError, AlertResult};
use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Report Metrics ==========

    pub static ref REPORTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "cattle_reports_created_total",
        "Total number of cattle reports created"
    )
    .unwrap();

    /// Votes by direction
    pub static ref VOTES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cattle_report_votes_total",
        "Total number of votes recorded",
        &["direction"]
    )
    .unwrap();

    pub static ref AUTO_MODERATION_DELETIONS_TOTAL: IntCounter = register_int_counter!(
        "cattle_report_auto_moderation_deletions_total",
        "Reports removed for crossing the downvote threshold"
    )
    .unwrap();

    // ========== Retention Metrics ==========

    pub static ref SWEEP_DELETIONS_TOTAL: IntCounter = register_int_counter!(
        "cattle_report_sweep_deletions_total",
        "Reports removed by the retention sweep"
    )
    .unwrap();

    pub static ref SWEEP_ERRORS_TOTAL: IntCounter = register_int_counter!(
        "cattle_report_sweep_errors_total",
        "Failures recorded by the retention sweep"
    )
    .unwrap();

    // ========== Upload Pipeline Metrics ==========

    /// Classification results by source (ai or fallback)
    pub static ref CLASSIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cattle_classifications_total",
        "Image classifications by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> AlertResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AlertError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| AlertError::Internal(format!("Metrics are not valid UTF-8: {}", e)))
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
}

/// Middleware recording request count and latency.
///
/// Uses the matched route template so report ids don't explode label
/// cardinality.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
