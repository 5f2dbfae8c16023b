/// Cattle Alert - crowdsourced road-hazard alerts
///
/// Drivers upload photos of cattle on the road. Each photo is compressed,
/// classified and stored as a geotagged report that other drivers see on a
/// map, vote on, and that expires after a retention window.

pub mod api;
pub mod auth;
pub mod classifier;
pub mod client_state;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod geo;
pub mod jobs;
pub mod media;
pub mod metrics;
pub mod reports;
pub mod server;
pub mod upload;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{AlertError, AlertResult};
