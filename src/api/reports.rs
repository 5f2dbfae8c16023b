/// Report endpoints: upload, listing, lookup, voting and manual removal
use crate::{
    auth::CronAuth,
    context::AppContext,
    error::{AlertError, AlertResult},
    geo::GeoPoint,
    reports::{CattleReport, ReportSummary, VoteDirection, VoteOutcome},
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::warn;

/// Build report routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/reports", post(create_report).get(list_reports))
        .route("/api/reports/:id", get(get_report).delete(delete_report))
        .route("/api/reports/:id/summary", get(get_summary))
        .route("/api/reports/:id/upvote", post(upvote))
        .route("/api/reports/:id/downvote", post(downvote))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub uploaded_by: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
}

fn point_from(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> AlertResult<Option<GeoPoint>> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon))),
        (None, None) => Ok(None),
        _ => Err(AlertError::Validation(
            "latitude and longitude must be given together".to_string(),
        )),
    }
}

/// Upload a photo; the raw image is the request body
async fn create_report(
    State(ctx): State<AppContext>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> AlertResult<(StatusCode, Json<CattleReport>)> {
    let location = point_from(params.latitude, params.longitude)?.unwrap_or_else(|| {
        GeoPoint::new(
            ctx.config.location.default_latitude,
            ctx.config.location.default_longitude,
        )
    });

    let report = ctx
        .upload
        .submit(location, &params.uploaded_by, body.to_vec())
        .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

/// Nearby reports, or all reports when no position is given.
///
/// Store failures degrade to an empty list.
async fn list_reports(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> AlertResult<Json<Vec<CattleReport>>> {
    let center = point_from(params.latitude, params.longitude)?;

    let result = match center {
        Some(center) => {
            let radius = params
                .radius_km
                .unwrap_or(ctx.config.location.default_radius_km);
            ctx.report_manager.list_nearby(center, radius).await
        }
        None => ctx.report_manager.list_all().await,
    };

    match result {
        Ok(reports) => Ok(Json(reports)),
        Err(e @ AlertError::Validation(_)) => Err(e),
        Err(e) => {
            warn!("Error fetching cattle reports, returning empty list: {}", e);
            Ok(Json(Vec::new()))
        }
    }
}

async fn get_report(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> AlertResult<Json<CattleReport>> {
    let mut report = ctx
        .report_manager
        .get_report(&id)
        .await?
        .ok_or_else(|| AlertError::NotFound(format!("Report {} not found", id)))?;
    report.image_loaded = true;
    Ok(Json(report))
}

async fn get_summary(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> AlertResult<Json<ReportSummary>> {
    ctx.report_manager
        .get_report_summary(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AlertError::NotFound(format!("Report {} not found", id)))
}

async fn upvote(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> AlertResult<Json<VoteOutcome>> {
    Ok(Json(ctx.report_manager.vote(&id, VoteDirection::Up).await?))
}

async fn downvote(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> AlertResult<Json<VoteOutcome>> {
    Ok(Json(ctx.report_manager.vote(&id, VoteDirection::Down).await?))
}

async fn delete_report(
    _auth: CronAuth,
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> AlertResult<StatusCode> {
    ctx.report_manager.delete_report(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
