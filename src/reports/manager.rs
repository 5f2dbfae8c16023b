/// Report Management
///
/// Applies the report lifecycle policy on top of a `ReportStore`: creation
/// with the image ceiling, reads, the nearby filter, voting with
/// auto-moderation, and deletion. The retention sweep lives in
/// `reports::retention`.
use crate::{
    config::PolicyConfig,
    error::{AlertError, AlertResult},
    geo::{within_radius, GeoPoint},
    media,
    metrics,
    reports::{
        models::{CattleReport, NewReport, ReportRecord, ReportSummary, VoteDirection, VoteOutcome},
        store::ReportStore,
    },
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Mime type of every stored image; uploads are re-encoded as JPEG
pub const STORED_IMAGE_MIME: &str = "image/jpeg";

/// Report manager
#[derive(Clone)]
pub struct ReportManager {
    store: Arc<dyn ReportStore>,
    policy: PolicyConfig,
    store_timeout: Duration,
}

impl ReportManager {
    pub fn new(store: Arc<dyn ReportStore>, policy: PolicyConfig, store_timeout: Duration) -> Self {
        Self {
            store,
            policy,
            store_timeout,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub(crate) fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Bound a store call by the configured timeout. Expiry and pool
    /// exhaustion surface as `StoreUnavailable`, distinct from not-found.
    pub(crate) async fn call<T, F>(&self, operation: &str, fut: F) -> AlertResult<T>
    where
        F: Future<Output = AlertResult<T>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(Err(AlertError::Database(sqlx::Error::PoolTimedOut)))
            | Ok(Err(AlertError::Database(sqlx::Error::PoolClosed))) => Err(
                AlertError::StoreUnavailable(format!("{}: connection pool unavailable", operation)),
            ),
            Ok(result) => result,
            Err(_) => Err(AlertError::StoreUnavailable(format!(
                "{} timed out after {:?}",
                operation, self.store_timeout
            ))),
        }
    }

    /// Create a report stamped with the current time
    pub async fn create_report(&self, new: NewReport, image: &[u8]) -> AlertResult<String> {
        self.create_report_at(new, image, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Create a report and return it as stored, without reading it back.
    ///
    /// A concurrent delete right after the write does not turn a
    /// successful upload into a miss.
    pub async fn publish_report(&self, new: NewReport, image: &[u8]) -> AlertResult<CattleReport> {
        self.publish_report_at(new, image, chrono::Utc::now().timestamp_millis())
            .await
    }

    pub(crate) async fn create_report_at(
        &self,
        new: NewReport,
        image: &[u8],
        timestamp: i64,
    ) -> AlertResult<String> {
        Ok(self.publish_report_at(new, image, timestamp).await?.id)
    }

    async fn publish_report_at(
        &self,
        new: NewReport,
        image: &[u8],
        timestamp: i64,
    ) -> AlertResult<CattleReport> {
        new.validate()?;

        let mut image_url = if image.is_empty() {
            String::new()
        } else {
            media::to_data_url(image, STORED_IMAGE_MIME)
        };

        if image_url.len() > self.policy.max_image_bytes {
            warn!(
                "Encoded image is {} bytes (limit {}), storing empty image reference",
                image_url.len(),
                self.policy.max_image_bytes
            );
            image_url.clear();
        }

        let record = ReportRecord {
            latitude: new.latitude,
            longitude: new.longitude,
            image_url,
            cow_count: new.cow_count,
            road_condition: new.road_condition,
            description: new.description.clone(),
            timestamp,
            uploaded_by: new.uploader_label().to_string(),
        };

        let id = self
            .call("create report", self.store.insert(record.clone()))
            .await
            .map_err(|e| {
                tracing::error!("Error creating cattle report: {}", e);
                match e {
                    AlertError::StoreUnavailable(_) | AlertError::StoreWrite(_) => e,
                    other => AlertError::StoreWrite(other.to_string()),
                }
            })?;

        metrics::REPORTS_CREATED_TOTAL.inc();
        info!("Created cattle report {} ({} cattle)", id, new.cow_count);

        Ok(CattleReport {
            id,
            latitude: record.latitude,
            longitude: record.longitude,
            image_loaded: true,
            image_url: record.image_url,
            cow_count: record.cow_count,
            road_condition: record.road_condition,
            description: record.description,
            timestamp: record.timestamp,
            uploaded_by: record.uploaded_by,
            upvotes: 0,
            downvotes: 0,
            user_vote: None,
        })
    }

    /// Full report including image; `None` when it does not exist
    pub async fn get_report(&self, id: &str) -> AlertResult<Option<CattleReport>> {
        self.call("get report", self.store.get(id)).await
    }

    /// Report without image, for lazy-loading views
    pub async fn get_report_summary(&self, id: &str) -> AlertResult<Option<ReportSummary>> {
        self.call("get report summary", self.store.get_summary(id))
            .await
    }

    /// All reports, most recent first
    pub async fn list_all(&self) -> AlertResult<Vec<CattleReport>> {
        let mut reports = self.call("list reports", self.store.list_all()).await?;
        sort_newest_first(&mut reports);
        Ok(reports)
    }

    /// Reports within `radius_km` of `center`, most recent first.
    ///
    /// Scans the whole collection; there is no spatial index.
    pub async fn list_nearby(&self, center: GeoPoint, radius_km: f64) -> AlertResult<Vec<CattleReport>> {
        if !center.is_valid() {
            return Err(AlertError::Validation(format!(
                "Invalid coordinates: {}, {}",
                center.latitude, center.longitude
            )));
        }
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(AlertError::Validation(format!("Invalid radius: {}", radius_km)));
        }

        let reports = self.list_all().await?;
        let total = reports.len();

        let nearby: Vec<CattleReport> = reports
            .into_iter()
            .filter(|r| within_radius(center, r.location(), radius_km))
            .collect();

        debug!(
            "Nearby query kept {} of {} reports within {} km",
            nearby.len(),
            total,
            radius_km
        );

        Ok(nearby)
    }

    /// Increment upvotes by exactly one
    pub async fn upvote(&self, id: &str) -> AlertResult<VoteOutcome> {
        let found = self
            .call("upvote", self.store.increment_upvotes(id))
            .await?;
        if !found {
            return Err(AlertError::Vote(format!("Report {} not found", id)));
        }

        metrics::VOTES_TOTAL.with_label_values(&["up"]).inc();

        let count = self
            .call("read counters", self.store.counters(id))
            .await?
            .map(|(up, _)| up);

        Ok(VoteOutcome {
            report_id: id.to_string(),
            direction: VoteDirection::Up,
            count,
            removed: false,
        })
    }

    /// Increment downvotes by exactly one, then delete the report if the
    /// counter has reached the threshold.
    ///
    /// Two concurrent downvotes may both observe the threshold and both try
    /// to delete; the second delete finds nothing and is not an error.
    pub async fn downvote(&self, id: &str) -> AlertResult<VoteOutcome> {
        let found = self
            .call("downvote", self.store.increment_downvotes(id))
            .await?;
        if !found {
            return Err(AlertError::Vote(format!("Report {} not found", id)));
        }

        metrics::VOTES_TOTAL.with_label_values(&["down"]).inc();

        let count = self
            .call("read counters", self.store.counters(id))
            .await?
            .map(|(_, down)| down);

        let removed = match count {
            Some(downvotes) if downvotes >= self.policy.downvote_threshold => {
                info!(
                    "Report {} reached {} downvotes (threshold {}), auto-deleting",
                    id, downvotes, self.policy.downvote_threshold
                );
                if self.delete_report(id).await? {
                    metrics::AUTO_MODERATION_DELETIONS_TOTAL.inc();
                }
                true
            }
            Some(_) => false,
            // Deleted concurrently between the increment and the re-read
            None => true,
        };

        Ok(VoteOutcome {
            report_id: id.to_string(),
            direction: VoteDirection::Down,
            count,
            removed,
        })
    }

    /// Apply a vote in the given direction
    pub async fn vote(&self, id: &str, direction: VoteDirection) -> AlertResult<VoteOutcome> {
        match direction {
            VoteDirection::Up => self.upvote(id).await,
            VoteDirection::Down => self.downvote(id).await,
        }
    }

    /// Delete a report. Deleting an id that no longer exists is not an
    /// error; the return value says whether anything was removed.
    pub async fn delete_report(&self, id: &str) -> AlertResult<bool> {
        let existed = self.call("delete report", self.store.delete(id)).await?;

        if existed {
            info!("Report {} successfully deleted", id);
        } else {
            debug!("Report {} already absent, nothing to delete", id);
        }

        Ok(existed)
    }

    /// Store liveness
    pub async fn health_check(&self) -> AlertResult<()> {
        self.call("ping", self.store.ping()).await
    }
}

fn sort_newest_first(reports: &mut [CattleReport]) {
    reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        reports::{
            models::RoadCondition,
            store::{scripted::ScriptedStore, SqliteReportStore},
        },
    };

    fn sighting(latitude: f64, longitude: f64) -> NewReport {
        NewReport {
            latitude,
            longitude,
            cow_count: 2,
            road_condition: RoadCondition::Moderate,
            description: "Two cows near the divider".to_string(),
            uploaded_by: String::new(),
        }
    }

    async fn create_test_manager(threshold: u32) -> ReportManager {
        let db = db::connect_in_memory().await.unwrap();
        let policy = PolicyConfig {
            downvote_threshold: threshold,
            ..PolicyConfig::default()
        };
        ReportManager::new(
            Arc::new(SqliteReportStore::new(db)),
            policy,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_create_sets_defaults() {
        let manager = create_test_manager(100).await;

        let before = chrono::Utc::now().timestamp_millis();
        let id = manager
            .create_report(sighting(12.0, 77.0), b"jpeg bytes")
            .await
            .unwrap();
        let report = manager.get_report(&id).await.unwrap().unwrap();

        assert!(report.timestamp >= before);
        assert_eq!((report.upvotes, report.downvotes), (0, 0));
        assert_eq!(report.uploaded_by, "Anonymous User");
        assert!(report.image_url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_oversized_image_is_dropped() {
        let manager = create_test_manager(100).await;

        let image = vec![0xFFu8; 800_000]; // base64 grows to ~1.07 MB
        let id = manager
            .create_report(sighting(12.0, 77.0), &image)
            .await
            .unwrap();
        let report = manager.get_report(&id).await.unwrap().unwrap();

        assert_eq!(report.image_url, "");
        assert_eq!(report.cow_count, 2);
        assert_eq!(report.road_condition, RoadCondition::Moderate);
        assert_eq!(report.description, "Two cows near the divider");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_coordinates() {
        let manager = create_test_manager(100).await;
        let result = manager.create_report(sighting(120.0, 0.0), b"").await;
        assert!(matches!(result, Err(AlertError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upvote_then_downvote_below_threshold() {
        let manager = create_test_manager(100).await;
        let id = manager.create_report(sighting(0.0, 0.0), b"").await.unwrap();

        let up = manager.upvote(&id).await.unwrap();
        assert_eq!(up.count, Some(1));
        let down = manager.downvote(&id).await.unwrap();
        assert_eq!(down.count, Some(1));
        assert!(!down.removed);

        let report = manager.get_report(&id).await.unwrap().unwrap();
        assert_eq!((report.upvotes, report.downvotes), (1, 1));
    }

    #[tokio::test]
    async fn test_threshold_crossing_deletes() {
        let manager = create_test_manager(100).await;
        let id = manager.create_report(sighting(0.0, 0.0), b"").await.unwrap();

        for n in 1..100 {
            let outcome = manager.downvote(&id).await.unwrap();
            assert!(!outcome.removed, "removed early at vote {}", n);
        }

        let last = manager.downvote(&id).await.unwrap();
        assert!(last.removed);
        assert_eq!(last.count, Some(100));
        assert!(manager.get_report(&id).await.unwrap().is_none());

        // A further vote targets a missing report
        assert!(matches!(manager.downvote(&id).await, Err(AlertError::Vote(_))));
    }

    #[tokio::test]
    async fn test_vote_on_missing_report_fails() {
        let manager = create_test_manager(1).await;
        assert!(matches!(manager.upvote("nope").await, Err(AlertError::Vote(_))));
        assert!(matches!(manager.downvote("nope").await, Err(AlertError::Vote(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let manager = create_test_manager(100).await;
        let id = manager.create_report(sighting(0.0, 0.0), b"").await.unwrap();

        assert!(manager.delete_report(&id).await.unwrap());
        assert!(!manager.delete_report(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_nearby_filters_and_orders() {
        let manager = create_test_manager(100).await;
        let near_old = manager
            .create_report_at(sighting(0.0, 0.0), b"", 1_000)
            .await
            .unwrap();
        let _far = manager
            .create_report_at(sighting(0.0, 1.0), b"", 3_000)
            .await
            .unwrap();
        let near_new = manager
            .create_report_at(sighting(0.001, 0.001), b"", 2_000)
            .await
            .unwrap();

        let ids: Vec<String> = manager
            .list_nearby(GeoPoint::new(0.0, 0.0), 5.0)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![near_new, near_old]);

        assert_eq!(manager.list_all().await.unwrap().len(), 3);
        assert!(manager
            .list_nearby(GeoPoint::new(0.0, 0.0), -1.0)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_summary_fetch() {
        let manager = create_test_manager(100).await;
        let id = manager.create_report(sighting(0.0, 0.0), b"img").await.unwrap();

        let summary = manager.get_report_summary(&id).await.unwrap().unwrap();
        assert_eq!(summary.id, id);
        assert!(manager.get_report_summary("missing").await.unwrap().is_none());
    }

    async fn scripted_manager(
        configure: impl FnOnce(&mut ScriptedStore),
        threshold: u32,
        timeout: Duration,
    ) -> (ScriptedStore, ReportManager) {
        let db = db::connect_in_memory().await.unwrap();
        let mut store = ScriptedStore::new(SqliteReportStore::new(db));
        configure(&mut store);
        let policy = PolicyConfig {
            downvote_threshold: threshold,
            ..PolicyConfig::default()
        };
        let manager = ReportManager::new(Arc::new(store.clone()), policy, timeout);
        (store, manager)
    }

    #[tokio::test]
    async fn test_stalled_store_is_unavailable_not_missing() {
        let (store, manager) = scripted_manager(
            |s| s.stall_reads = true,
            100,
            Duration::from_millis(50),
        )
        .await;
        let id = store.inner.insert(ReportRecord {
            latitude: 0.0,
            longitude: 0.0,
            image_url: String::new(),
            cow_count: 1,
            road_condition: RoadCondition::Good,
            description: String::new(),
            timestamp: 1,
            uploaded_by: "Anonymous User".to_string(),
        })
        .await
        .unwrap();

        let result = manager.get_report(&id).await;
        assert!(matches!(result, Err(AlertError::StoreUnavailable(_))), "{:?}", result);
        assert!(result.unwrap_err().is_retryable());

        assert!(matches!(
            manager.list_all().await,
            Err(AlertError::StoreUnavailable(_))
        ));
        assert!(matches!(
            manager.health_check().await,
            Err(AlertError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_report_deleted_between_downvote_and_reread() {
        let (store, manager) = scripted_manager(
            |s| s.delete_after_downvote = true,
            100,
            Duration::from_secs(5),
        )
        .await;
        let id = manager.create_report(sighting(0.0, 0.0), b"").await.unwrap();

        let outcome = manager.downvote(&id).await.unwrap();
        assert_eq!(outcome.count, None);
        assert!(outcome.removed);
        assert!(store.inner.get(&id).await.unwrap().is_none());

        // A racing threshold crossing deleting the same id again is harmless
        assert!(!manager.delete_report(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_threshold_crossing_after_racing_delete() {
        let (store, manager) = scripted_manager(
            |s| s.delete_after_reread = true,
            1,
            Duration::from_secs(5),
        )
        .await;
        let id = manager.create_report(sighting(0.0, 0.0), b"").await.unwrap();

        // The re-read sees the threshold, but the row is already gone when
        // the auto-delete runs
        let outcome = manager.downvote(&id).await.unwrap();
        assert_eq!(outcome.count, Some(1));
        assert!(outcome.removed);
        assert!(store.inner.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_survives_concurrent_delete() {
        let (_store, manager) = scripted_manager(
            |s| s.delete_after_insert = true,
            100,
            Duration::from_secs(5),
        )
        .await;

        let report = manager
            .publish_report(sighting(10.0, 20.0), b"jpeg")
            .await
            .unwrap();
        assert_eq!(report.latitude, 10.0);
        assert_eq!(report.uploaded_by, "Anonymous User");
        assert!(report.image_url.starts_with("data:image/jpeg;base64,"));
        assert_eq!((report.upvotes, report.downvotes), (0, 0));
        assert!(manager.get_report(&report.id).await.unwrap().is_none());
    }
}
