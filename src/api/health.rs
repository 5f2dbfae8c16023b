/// Health and monitoring endpoints
///
/// - `/health`: liveness, always 200 while the process serves requests
/// - `/health/ready`: readiness, 503 when the report store does not answer
/// - `/metrics`: Prometheus text exposition
use crate::{context::AppContext, error::AlertResult, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::time::Instant;

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
        .route("/metrics", get(metrics_handler))
}

/// Returns simple JSON with status and version
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let start = Instant::now();

    if let Err(e) = ctx.report_manager.health_check().await {
        tracing::warn!(error = %e, "readiness_probe_failed: report store check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(json!({
        "status": "ready",
        "version": env!("CARGO_PKG_VERSION"),
        "storeResponseTimeMs": start.elapsed().as_millis() as u64,
    })))
}

async fn metrics_handler() -> AlertResult<impl IntoResponse> {
    let body = metrics::render_metrics()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let (_ctx, app) = test_app().await;

        let (status, body) = send_json(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send_json(&app, get("/health/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_readiness_fails_when_store_is_gone() {
        let (ctx, app) = test_app().await;
        ctx.db.close().await;

        let (status, _) = send(&app, get("/health/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let (_ctx, app) = test_app().await;
        send(&app, get("/health")).await;

        let (status, body) = send(&app, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("http_requests_total"));
    }
}
