/// The auto-moderation counter only moves when a threshold crossing
/// actually removes a row. Kept in its own binary so no other test shares
/// the process-wide registry.
use async_trait::async_trait;
use cattle_alert::{
    config::PolicyConfig,
    db,
    metrics::AUTO_MODERATION_DELETIONS_TOTAL,
    reports::{
        CattleReport, NewReport, ReportManager, ReportRecord, ReportStore, ReportSummary,
        RoadCondition, SqliteReportStore,
    },
    AlertResult,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// Removes the row right after its counters are read while `racing` is set,
/// as a concurrent downvote would
struct RacingDeletes {
    inner: SqliteReportStore,
    racing: AtomicBool,
}

#[async_trait]
impl ReportStore for RacingDeletes {
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
        let counters = self.inner.counters(id).await?;
        if self.racing.load(Ordering::SeqCst) {
            self.inner.delete(id).await?;
        }
        Ok(counters)
    }
    async fn delete(&self, id: &str) -> AlertResult<bool> {
        self.inner.delete(id).await
    }
    async fn ping(&self) -> AlertResult<()> {
        self.inner.ping().await
    }
}

fn sighting() -> NewReport {
    NewReport {
        latitude: 23.02,
        longitude: 72.57,
        cow_count: 2,
        road_condition: RoadCondition::Moderate,
        description: "Cows resting on the median".to_string(),
        uploaded_by: String::new(),
    }
}

#[tokio::test]
async fn test_counter_tracks_real_deletions_only() {
    let pool = db::connect_in_memory().await.unwrap();
    let store = Arc::new(RacingDeletes {
        inner: SqliteReportStore::new(pool),
        racing: AtomicBool::new(true),
    });
    let policy = PolicyConfig {
        downvote_threshold: 1,
        ..PolicyConfig::default()
    };
    let manager = ReportManager::new(store.clone(), policy, Duration::from_secs(5));

    let start = AUTO_MODERATION_DELETIONS_TOTAL.get();

    let raced = manager.create_report(sighting(), b"").await.unwrap();
    let outcome = manager.downvote(&raced).await.unwrap();
    assert!(outcome.removed);
    assert_eq!(AUTO_MODERATION_DELETIONS_TOTAL.get(), start);

    store.racing.store(false, Ordering::SeqCst);
    let plain = manager.create_report(sighting(), b"").await.unwrap();
    let outcome = manager.downvote(&plain).await.unwrap();
    assert!(outcome.removed);
    assert_eq!(AUTO_MODERATION_DELETIONS_TOTAL.get(), start + 1);
}
