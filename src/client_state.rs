/// Per-client view state
///
/// What a single map client holds between requests: its position, the
/// report markers it shows, the selected report, a loading flag and the
/// votes it has already cast. Owned by whoever drives the client and passed
/// around explicitly.
use crate::{
    config::LocationConfig,
    geo::{hotspot_intensity, GeoPoint},
    reports::{CattleReport, VoteDirection, VoteOutcome},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedClientState = Arc<RwLock<ClientState>>;

#[derive(Debug, Clone)]
pub struct ClientState {
    default_location: GeoPoint,
    user_location: Option<GeoPoint>,
    reports: Vec<CattleReport>,
    selected: Option<String>,
    loading: bool,
    votes: HashMap<String, VoteDirection>,
}

impl ClientState {
    pub fn new(location: &LocationConfig) -> Self {
        Self {
            default_location: GeoPoint::new(location.default_latitude, location.default_longitude),
            user_location: None,
            reports: Vec::new(),
            selected: None,
            loading: false,
            votes: HashMap::new(),
        }
    }

    pub fn shared(location: &LocationConfig) -> SharedClientState {
        Arc::new(RwLock::new(Self::new(location)))
    }

    pub fn set_user_location(&mut self, location: Option<GeoPoint>) {
        self.user_location = location;
    }

    pub fn user_location(&self) -> Option<GeoPoint> {
        self.user_location
    }

    /// The user's position, or the configured default when unknown
    pub fn effective_location(&self) -> GeoPoint {
        self.user_location.unwrap_or(self.default_location)
    }

    /// Replace markers, re-applying remembered votes
    pub fn set_reports(&mut self, reports: Vec<CattleReport>) {
        self.reports = reports;
        for report in &mut self.reports {
            report.user_vote = self.votes.get(&report.id).copied();
        }
    }

    /// Newest reports go first
    pub fn add_report(&mut self, mut report: CattleReport) {
        report.user_vote = self.votes.get(&report.id).copied();
        self.reports.retain(|r| r.id != report.id);
        self.reports.insert(0, report);
    }

    pub fn remove_report(&mut self, id: &str) -> Option<CattleReport> {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        let index = self.reports.iter().position(|r| r.id == id)?;
        Some(self.reports.remove(index))
    }

    pub fn reports(&self) -> &[CattleReport] {
        &self.reports
    }

    /// Select a report by id; unknown ids clear the selection
    pub fn select_report(&mut self, id: Option<&str>) {
        self.selected = id
            .filter(|id| self.reports.iter().any(|r| r.id == *id))
            .map(str::to_string);
    }

    pub fn selected_report(&self) -> Option<&CattleReport> {
        let id = self.selected.as_deref()?;
        self.reports.iter().find(|r| r.id == id)
    }

    /// Map colouring weight for a shown report, from how many shown
    /// reports cluster around it
    pub fn intensity_for(&self, id: &str) -> Option<f64> {
        let report = self.reports.iter().find(|r| r.id == id)?;
        Some(hotspot_intensity(
            report.location(),
            self.reports.iter().map(CattleReport::location),
        ))
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Remember a vote. Only the first vote per report counts; returns
    /// false when this client already voted on it.
    pub fn record_vote(&mut self, id: &str, direction: VoteDirection) -> bool {
        if self.votes.contains_key(id) {
            return false;
        }
        self.votes.insert(id.to_string(), direction);
        if let Some(report) = self.reports.iter_mut().find(|r| r.id == id) {
            report.user_vote = Some(direction);
        }
        true
    }

    pub fn vote_for(&self, id: &str) -> Option<VoteDirection> {
        self.votes.get(id).copied()
    }

    /// Reflect a server-side vote result in the local markers
    pub fn apply_vote_outcome(&mut self, outcome: &VoteOutcome) {
        if outcome.removed {
            self.remove_report(&outcome.report_id);
            return;
        }

        let Some(report) = self.reports.iter_mut().find(|r| r.id == outcome.report_id) else {
            return;
        };
        match (outcome.direction, outcome.count) {
            (VoteDirection::Up, Some(count)) => report.upvotes = count,
            (VoteDirection::Down, Some(count)) => report.downvotes = count,
            (VoteDirection::Up, None) => report.upvotes += 1,
            (VoteDirection::Down, None) => report.downvotes += 1,
        }
    }
}
