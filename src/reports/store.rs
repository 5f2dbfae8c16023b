/// Report store access
///
/// The `ReportStore` trait is the document-store contract; `SqliteReportStore`
/// backs it with a single `cattle_reports` table.
use crate::{
    error::{AlertError, AlertResult},
    reports::models::{CattleReport, ReportRecord, ReportSummary, RoadCondition},
};
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Persistence contract for the report collection
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a record and return its newly assigned identifier
    async fn insert(&self, record: ReportRecord) -> AlertResult<String>;

    /// Full fetch including the image reference
    async fn get(&self, id: &str) -> AlertResult<Option<CattleReport>>;

    /// Fetch without the image reference
    async fn get_summary(&self, id: &str) -> AlertResult<Option<ReportSummary>>;

    /// Whole collection, most recent first
    async fn list_all(&self) -> AlertResult<Vec<CattleReport>>;

    /// Atomic +1 on upvotes; false when the report does not exist
    async fn increment_upvotes(&self, id: &str) -> AlertResult<bool>;

    /// Atomic +1 on downvotes; false when the report does not exist
    async fn increment_downvotes(&self, id: &str) -> AlertResult<bool>;

    /// Current counters, `None` once the report is gone
    async fn counters(&self, id: &str) -> AlertResult<Option<(u32, u32)>>;

    /// Remove a report; returns whether it existed
    async fn delete(&self, id: &str) -> AlertResult<bool>;

    /// Liveness probe
    async fn ping(&self) -> AlertResult<()>;
}

/// SQLite-backed report store
#[derive(Clone)]
pub struct SqliteReportStore {
    db: SqlitePool,
}

impl SqliteReportStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn parse_report(row: &SqliteRow) -> AlertResult<CattleReport> {
        let condition: String = row.try_get("road_condition")?;

        Ok(CattleReport {
            id: row.try_get("id")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            image_url: row.try_get("image_url")?,
            cow_count: counter(row, "cow_count")?,
            road_condition: RoadCondition::from_str(&condition)?,
            description: row.try_get("description")?,
            timestamp: row.try_get("timestamp")?,
            uploaded_by: row.try_get("uploaded_by")?,
            upvotes: counter(row, "upvotes")?,
            downvotes: counter(row, "downvotes")?,
            user_vote: None,
            image_loaded: true,
        })
    }

    fn parse_summary(row: &SqliteRow) -> AlertResult<ReportSummary> {
        let condition: String = row.try_get("road_condition")?;

        Ok(ReportSummary {
            id: row.try_get("id")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            cow_count: counter(row, "cow_count")?,
            road_condition: RoadCondition::from_str(&condition)?,
            description: row.try_get("description")?,
            timestamp: row.try_get("timestamp")?,
            uploaded_by: row.try_get("uploaded_by")?,
            upvotes: counter(row, "upvotes")?,
            downvotes: counter(row, "downvotes")?,
            image_loaded: false,
        })
    }
}

fn counter(row: &SqliteRow, column: &str) -> AlertResult<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| AlertError::Internal(format!("Column {} out of range: {}", column, value)))
}

/// Connection problems stay `Database` so callers can tell an unreachable
/// store from a rejected write
fn write_error(e: sqlx::Error) -> AlertError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => AlertError::Database(e),
        other => AlertError::StoreWrite(other.to_string()),
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn insert(&self, record: ReportRecord) -> AlertResult<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO cattle_reports
            (id, latitude, longitude, image_url, cow_count, road_condition,
             description, timestamp, uploaded_by, upvotes, downvotes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0)
            "#,
        )
        .bind(&id)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(&record.image_url)
        .bind(record.cow_count as i64)
        .bind(record.road_condition.as_str())
        .bind(&record.description)
        .bind(record.timestamp)
        .bind(&record.uploaded_by)
        .execute(&self.db)
        .await
        .map_err(write_error)?;

        Ok(id)
    }

    async fn get(&self, id: &str) -> AlertResult<Option<CattleReport>> {
        let row = sqlx::query(
            r#"
            SELECT id, latitude, longitude, image_url, cow_count, road_condition,
                   description, timestamp, uploaded_by, upvotes, downvotes
            FROM cattle_reports
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(Self::parse_report).transpose()
    }

    async fn get_summary(&self, id: &str) -> AlertResult<Option<ReportSummary>> {
        let row = sqlx::query(
            r#"
            SELECT id, latitude, longitude, cow_count, road_condition,
                   description, timestamp, uploaded_by, upvotes, downvotes
            FROM cattle_reports
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(Self::parse_summary).transpose()
    }

    async fn list_all(&self) -> AlertResult<Vec<CattleReport>> {
        let rows = sqlx::query(
            r#"
            SELECT id, latitude, longitude, image_url, cow_count, road_condition,
                   description, timestamp, uploaded_by, upvotes, downvotes
            FROM cattle_reports
            ORDER BY timestamp DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Self::parse_report).collect()
    }

    async fn increment_upvotes(&self, id: &str) -> AlertResult<bool> {
        let result = sqlx::query("UPDATE cattle_reports SET upvotes = upvotes + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_downvotes(&self, id: &str) -> AlertResult<bool> {
        let result =
            sqlx::query("UPDATE cattle_reports SET downvotes = downvotes + 1 WHERE id = ?")
                .bind(id)
                .execute(&self.db)
                .await
                .map_err(write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn counters(&self, id: &str) -> AlertResult<Option<(u32, u32)>> {
        let row = sqlx::query("SELECT upvotes, downvotes FROM cattle_reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => Ok(Some((counter(&row, "upvotes")?, counter(&row, "downvotes")?))),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> AlertResult<bool> {
        let result = sqlx::query("DELETE FROM cattle_reports WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(write_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AlertResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
