/// Retention sweep trigger, called by an external scheduler
use crate::{auth::CronAuth, context::AppContext, error::AlertError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::{error, info};

/// Build cleanup routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/cleanup", get(count_expired).post(run_cleanup))
}

fn failure(e: AlertError) -> Response {
    error!("Cleanup endpoint error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": e.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

/// Run the sweep now
async fn run_cleanup(_auth: CronAuth, State(ctx): State<AppContext>) -> Response {
    info!("Cleanup job triggered");

    let now = chrono::Utc::now();
    let result = ctx
        .report_manager
        .sweep_expired(now.timestamp_millis())
        .await;

    Json(json!({
        "success": true,
        "message": "Cleanup job completed",
        "deletedCount": result.deleted_count,
        "errors": result.errors,
        "timestamp": now.to_rfc3339(),
    }))
    .into_response()
}

/// How many reports the next sweep would remove
async fn count_expired(_auth: CronAuth, State(ctx): State<AppContext>) -> Response {
    let now = chrono::Utc::now();

    match ctx.report_manager.count_expired(now.timestamp_millis()).await {
        Ok(count) => Json(json!({
            "success": true,
            "expiredReportsCount": count,
            "message": format!("{} reports are eligible for deletion", count),
            "timestamp": now.to_rfc3339(),
        }))
        .into_response(),
        Err(e) => failure(e),
    }
}
