/// Report data models
use crate::{
    error::{AlertError, AlertResult},
    geo::GeoPoint,
};
use serde::{Deserialize, Serialize};

/// Uploader label used when none is given
pub const ANONYMOUS_UPLOADER: &str = "Anonymous User";

/// Road condition as assessed by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadCondition {
    Good,
    Moderate,
    Poor,
}

impl RoadCondition {
    pub const ALL: [RoadCondition; 3] = [
        RoadCondition::Good,
        RoadCondition::Moderate,
        RoadCondition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoadCondition::Good => "Good",
            RoadCondition::Moderate => "Moderate",
            RoadCondition::Poor => "Poor",
        }
    }

    pub fn from_str(s: &str) -> AlertResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "good" => Ok(RoadCondition::Good),
            "moderate" => Ok(RoadCondition::Moderate),
            "poor" => Ok(RoadCondition::Poor),
            _ => Err(AlertError::Validation(format!("Invalid road condition: {}", s))),
        }
    }
}

/// Per-viewer vote marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

/// One user-submitted cattle sighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CattleReport {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Inline `data:` URL, or empty when the image was too large
    pub image_url: String,
    pub cow_count: u32,
    pub road_condition: RoadCondition,
    pub description: String,
    /// Milliseconds since epoch, set at write time
    pub timestamp: i64,
    pub uploaded_by: String,
    pub upvotes: u32,
    pub downvotes: u32,
    /// Never persisted; filled in by clients from their own vote memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<VoteDirection>,
    #[serde(default)]
    pub image_loaded: bool,
}

impl CattleReport {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Drop the image reference for lazy-loading views
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            id: self.id.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            cow_count: self.cow_count,
            road_condition: self.road_condition,
            description: self.description.clone(),
            timestamp: self.timestamp,
            uploaded_by: self.uploaded_by.clone(),
            upvotes: self.upvotes,
            downvotes: self.downvotes,
            image_loaded: false,
        }
    }
}

/// A report without its image reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub cow_count: u32,
    pub road_condition: RoadCondition,
    pub description: String,
    pub timestamp: i64,
    pub uploaded_by: String,
    pub upvotes: u32,
    pub downvotes: u32,
    pub image_loaded: bool,
}

/// Input for a new report; the store assigns id, timestamp and counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub latitude: f64,
    pub longitude: f64,
    pub cow_count: u32,
    pub road_condition: RoadCondition,
    pub description: String,
    #[serde(default)]
    pub uploaded_by: String,
}

impl NewReport {
    pub fn validate(&self) -> AlertResult<()> {
        if !GeoPoint::new(self.latitude, self.longitude).is_valid() {
            return Err(AlertError::Validation(format!(
                "Invalid coordinates: {}, {}",
                self.latitude, self.longitude
            )));
        }
        Ok(())
    }

    pub fn uploader_label(&self) -> &str {
        let label = self.uploaded_by.trim();
        if label.is_empty() {
            ANONYMOUS_UPLOADER
        } else {
            label
        }
    }
}

/// Fully resolved row ready to be written
#[derive(Debug, Clone)]
pub struct ReportRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: String,
    pub cow_count: u32,
    pub road_condition: RoadCondition,
    pub description: String,
    pub timestamp: i64,
    pub uploaded_by: String,
}

/// Result of a vote call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub report_id: String,
    pub direction: VoteDirection,
    /// Counter value observed after the increment, when still readable
    pub count: Option<u32>,
    /// The vote crossed the downvote threshold and the report was deleted
    pub removed: bool,
}

/// Aggregate result of a retention sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub deleted_count: u64,
    pub errors: Vec<String>,
}
