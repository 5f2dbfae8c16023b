use crate::metrics;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        let sweep_interval = self.context.config.jobs.sweep_interval_secs;
        if sweep_interval > 0 {
            tokio::spawn(Self::retention_sweep_job(Arc::clone(&self), sweep_interval));
        } else {
            info!("In-process retention sweep disabled, expecting POST /api/cleanup");
        }

        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Remove expired reports on a fixed interval
    async fn retention_sweep_job(scheduler: Arc<Self>, every_secs: u64) {
        let mut interval = interval(Duration::from_secs(every_secs));

        loop {
            interval.tick().await;
            info!("Running retention sweep");

            let result = tasks::sweep_expired_reports(&scheduler.context).await;
            if result.errors.is_empty() {
                metrics::record_background_job("retention_sweep", "success");
                if result.deleted_count > 0 {
                    info!("Retention sweep removed {} reports", result.deleted_count);
                }
            } else {
                metrics::record_background_job("retention_sweep", "partial");
                warn!(
                    "Retention sweep removed {} reports with {} errors",
                    result.deleted_count,
                    result.errors.len()
                );
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => metrics::record_background_job("health_check", "success"),
                Err(e) => {
                    metrics::record_background_job("health_check", "failure");
                    error!("Health check failed: {}", e);
                }
            }
        }
    }
}
