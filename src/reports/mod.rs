/// Cattle report lifecycle
///
/// Store access, voting with auto-moderation, and the retention sweep.

pub mod manager;
pub mod models;
pub mod retention;
pub mod store;

pub use manager::ReportManager;
pub use models::*;
pub use store::{ReportStore, SqliteReportStore};
