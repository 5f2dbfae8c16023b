/// Retention sweep
///
/// Reports older than the retention window are purged in a best-effort
/// batch: each deletion stands alone, failures are collected and the sweep
/// carries on.
use crate::{
    error::AlertResult,
    metrics,
    reports::{manager::ReportManager, models::SweepReport},
};
use chrono::{TimeZone, Utc};
use tracing::{error, info};

/// Oldest timestamp (exclusive) that survives a sweep at `now`
pub fn retention_cutoff(now_millis: i64, retention_millis: i64) -> i64 {
    now_millis.saturating_sub(retention_millis)
}

fn iso(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

impl ReportManager {
    /// Delete every report with `timestamp < now - retention`.
    ///
    /// Listing failures end the sweep with nothing deleted and the error
    /// recorded; per-report failures are recorded and skipped.
    pub async fn sweep_expired(&self, now_millis: i64) -> SweepReport {
        let cutoff = retention_cutoff(now_millis, self.policy().retention_millis());
        let mut result = SweepReport::default();

        info!("[Cleanup Job] Starting cleanup at {}", iso(now_millis));
        info!("[Cleanup Job] Looking for reports older than {}", iso(cutoff));

        let reports = match self.call("list reports", self.store().list_all()).await {
            Ok(reports) => reports,
            Err(e) => {
                error!("[Cleanup Job] Fatal error during cleanup: {}", e);
                metrics::SWEEP_ERRORS_TOTAL.inc();
                result.errors.push(e.to_string());
                return result;
            }
        };

        info!("[Cleanup Job] Found {} total reports", reports.len());

        for report in reports.iter().filter(|r| r.timestamp < cutoff) {
            match self.call("delete report", self.store().delete(&report.id)).await {
                Ok(_) => {
                    result.deleted_count += 1;
                    info!(
                        "[Cleanup Job] Deleted report: {} (age: {} minutes)",
                        report.id,
                        (now_millis - report.timestamp) / 60_000
                    );
                }
                Err(e) => {
                    let message = format!("Failed to delete report {}: {}", report.id, e);
                    error!("[Cleanup Job] {}", message);
                    metrics::SWEEP_ERRORS_TOTAL.inc();
                    result.errors.push(message);
                }
            }
        }

        metrics::SWEEP_DELETIONS_TOTAL.inc_by(result.deleted_count);
        info!(
            "[Cleanup Job] Cleanup completed. Deleted {} reports.",
            result.deleted_count
        );

        result
    }

    /// Number of reports a sweep at `now` would delete. Read-only.
    pub async fn count_expired(&self, now_millis: i64) -> AlertResult<u64> {
        let cutoff = retention_cutoff(now_millis, self.policy().retention_millis());
        let reports = self.call("list reports", self.store().list_all()).await?;

        Ok(reports.iter().filter(|r| r.timestamp < cutoff).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PolicyConfig,
        db,
        error::{AlertError, AlertResult},
        reports::{
            models::{CattleReport, NewReport, ReportRecord, ReportSummary, RoadCondition},
            store::{ReportStore, SqliteReportStore},
        },
    };
    use async_trait::async_trait;
    use std::{collections::HashSet, sync::Arc, time::Duration};

    const HOUR: i64 = 60 * 60 * 1000;
    const NOW: i64 = 1_750_000_000_000;

    /// Delegating store whose deletes fail for chosen ids
    struct FlakyDeletes {
        inner: SqliteReportStore,
        failing: HashSet<String>,
    }

    #[async_trait]
    impl ReportStore for FlakyDeletes {
        async fn insert(&self, record: ReportRecord) -> AlertResult<String> {
            self.inner.insert(record).await
        }
        async fn get(&self, id: &str) -> AlertResult<Option<CattleReport>> {
            self.inner.get(id).await
        }
        async fn get_summary(&self, id: &str) -> AlertResult<Option<ReportSummary>> {
            self.inner.get_summary(id).await
        }
        async fn list_all(&self) -> AlertResult<Vec<CattleReport>> {
            self.inner.list_all().await
        }
        async fn increment_upvotes(&self, id: &str) -> AlertResult<bool> {
            self.inner.increment_upvotes(id).await
        }
        async fn increment_downvotes(&self, id: &str) -> AlertResult<bool> {
            self.inner.increment_downvotes(id).await
        }
        async fn counters(&self, id: &str) -> AlertResult<Option<(u32, u32)>> {
            self.inner.counters(id).await
        }
        async fn delete(&self, id: &str) -> AlertResult<bool> {
            if self.failing.contains(id) {
                return Err(AlertError::StoreWrite("permission denied".to_string()));
            }
            self.inner.delete(id).await
        }
        async fn ping(&self) -> AlertResult<()> {
            self.inner.ping().await
        }
    }

    fn sighting() -> NewReport {
        NewReport {
            latitude: 26.9,
            longitude: 75.8,
            cow_count: 1,
            road_condition: RoadCondition::Good,
            description: "Single cow on the shoulder".to_string(),
            uploaded_by: String::new(),
        }
    }

    fn manager_over(store: Arc<dyn ReportStore>) -> ReportManager {
        ReportManager::new(store, PolicyConfig::default(), Duration::from_secs(5))
    }

    #[test]
    fn test_cutoff() {
        assert_eq!(retention_cutoff(NOW, 24 * HOUR), NOW - 24 * HOUR);
        assert_eq!(retention_cutoff(NOW, i64::MAX), NOW - i64::MAX);
    }

    #[tokio::test]
    async fn test_huge_retention_keeps_everything() {
        let db = db::connect_in_memory().await.unwrap();
        let policy = PolicyConfig {
            retention_hours: u64::MAX,
            ..PolicyConfig::default()
        };
        let manager = ReportManager::new(
            Arc::new(SqliteReportStore::new(db)),
            policy,
            Duration::from_secs(5),
        );
        manager
            .create_report_at(sighting(), b"", NOW - 48 * HOUR)
            .await
            .unwrap();

        assert_eq!(manager.count_expired(NOW).await.unwrap(), 0);
        assert_eq!(manager.sweep_expired(NOW).await.deleted_count, 0);
        assert_eq!(manager.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let db = db::connect_in_memory().await.unwrap();
        let manager = manager_over(Arc::new(SqliteReportStore::new(db)));

        let stale = manager
            .create_report_at(sighting(), b"", NOW - 25 * HOUR)
            .await
            .unwrap();
        let boundary = manager
            .create_report_at(sighting(), b"", NOW - 24 * HOUR)
            .await
            .unwrap();
        let fresh = manager
            .create_report_at(sighting(), b"", NOW - HOUR)
            .await
            .unwrap();

        assert_eq!(manager.count_expired(NOW).await.unwrap(), 1);

        let first = manager.sweep_expired(NOW).await;
        assert_eq!(first.deleted_count, 1);
        assert!(first.errors.is_empty());

        assert!(manager.get_report(&stale).await.unwrap().is_none());
        assert!(manager.get_report(&boundary).await.unwrap().is_some());
        assert!(manager.get_report(&fresh).await.unwrap().is_some());

        let second = manager.sweep_expired(NOW).await;
        assert_eq!(second.deleted_count, 0);
        assert_eq!(manager.count_expired(NOW).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_does_not_mutate() {
        let db = db::connect_in_memory().await.unwrap();
        let manager = manager_over(Arc::new(SqliteReportStore::new(db)));

        manager
            .create_report_at(sighting(), b"", NOW - 48 * HOUR)
            .await
            .unwrap();

        assert_eq!(manager.count_expired(NOW).await.unwrap(), 1);
        assert_eq!(manager.count_expired(NOW).await.unwrap(), 1);
        assert_eq!(manager.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_continues_past_failures() {
        let db = db::connect_in_memory().await.unwrap();
        let inner = SqliteReportStore::new(db);

        let stuck = inner
            .insert(ReportRecord {
                latitude: 0.0,
                longitude: 0.0,
                image_url: String::new(),
                cow_count: 1,
                road_condition: RoadCondition::Poor,
                description: String::new(),
                timestamp: NOW - 30 * HOUR,
                uploaded_by: "Anonymous User".to_string(),
            })
            .await
            .unwrap();
        let manager = manager_over(Arc::new(FlakyDeletes {
            inner,
            failing: HashSet::from([stuck.clone()]),
        }));

        manager
            .create_report_at(sighting(), b"", NOW - 40 * HOUR)
            .await
            .unwrap();
        manager
            .create_report_at(sighting(), b"", NOW - 26 * HOUR)
            .await
            .unwrap();

        let result = manager.sweep_expired(NOW).await;
        assert_eq!(result.deleted_count, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains(&stuck));

        let remaining = manager.list_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, stuck);
    }
}
