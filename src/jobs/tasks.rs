/// Background task implementations
use crate::{context::AppContext, error::AlertResult, reports::SweepReport};

/// Purge reports past the retention window
pub async fn sweep_expired_reports(ctx: &AppContext) -> SweepReport {
    ctx.report_manager
        .sweep_expired(chrono::Utc::now().timestamp_millis())
        .await
}

/// Health check - verify the report store answers
pub async fn health_check(ctx: &AppContext) -> AlertResult<()> {
    ctx.report_manager.health_check().await
}
