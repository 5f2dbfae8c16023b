/// Upload flow
///
/// Compress the photo, classify it (falling back on any classifier failure)
/// and create the report.
use crate::{
    classifier::{self, ImageClassifier},
    error::{AlertError, AlertResult},
    geo::GeoPoint,
    media::ImageCompressor,
    reports::{CattleReport, NewReport, ReportManager},
};
use std::sync::Arc;
use tracing::info;

pub struct UploadPipeline {
    compressor: ImageCompressor,
    classifier: Option<Arc<dyn ImageClassifier>>,
    reports: Arc<ReportManager>,
}

impl UploadPipeline {
    pub fn new(
        compressor: ImageCompressor,
        classifier: Option<Arc<dyn ImageClassifier>>,
        reports: Arc<ReportManager>,
    ) -> Self {
        Self {
            compressor,
            classifier,
            reports,
        }
    }

    /// Turn a raw photo into a stored report.
    ///
    /// Compression failure aborts the upload; classification never does.
    pub async fn submit(
        &self,
        location: GeoPoint,
        uploaded_by: &str,
        raw: Vec<u8>,
    ) -> AlertResult<CattleReport> {
        if !location.is_valid() {
            return Err(AlertError::Validation(format!(
                "Invalid coordinates: {}, {}",
                location.latitude, location.longitude
            )));
        }

        let compressor = self.compressor.clone();
        let compressed = tokio::task::spawn_blocking(move || compressor.compress(&raw))
            .await
            .map_err(|e| AlertError::Internal(format!("Compression task failed: {}", e)))??;

        info!(
            "Upload compressed {} -> {} bytes",
            compressed.original_size, compressed.compressed_size
        );

        let analysis =
            classifier::classify_or_fallback(self.classifier.as_deref(), &compressed.bytes).await;

        let new = NewReport {
            latitude: location.latitude,
            longitude: location.longitude,
            cow_count: analysis.cow_count,
            road_condition: analysis.road_condition,
            description: analysis.description,
            uploaded_by: uploaded_by.to_string(),
        };

        self.reports.publish_report(new, &compressed.bytes).await
    }
}
