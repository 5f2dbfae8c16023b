/// Application context and dependency injection
use crate::{
    classifier::{GeminiClassifier, ImageClassifier},
    config::ServerConfig,
    db,
    error::{AlertError, AlertResult},
    media::ImageCompressor,
    reports::{ReportManager, ReportStore, SqliteReportStore},
    upload::UploadPipeline,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub report_manager: Arc<ReportManager>,
    pub upload: Arc<UploadPipeline>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AlertResult<Self> {
        config.validate()?;

        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory)
                .await
                .map_err(|e| {
                    AlertError::Internal(format!(
                        "Failed to create directory {:?}: {}",
                        config.storage.data_directory, e
                    ))
                })?;
        }

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let classifier = GeminiClassifier::from_config(&config.classifier)
            .map_err(|e| AlertError::Internal(format!("Failed to build classifier: {:#}", e)))?
            .map(|c| Arc::new(c) as Arc<dyn ImageClassifier>);

        Ok(Self::with_parts(config, db, classifier))
    }

    /// Assemble a context over an existing pool and classifier
    pub fn with_parts(
        config: ServerConfig,
        db: SqlitePool,
        classifier: Option<Arc<dyn ImageClassifier>>,
    ) -> Self {
        let store = Arc::new(SqliteReportStore::new(db.clone()));
        Self::with_store(config, db, store, classifier)
    }

    /// Assemble a context over any report store
    pub fn with_store(
        config: ServerConfig,
        db: SqlitePool,
        store: Arc<dyn ReportStore>,
        classifier: Option<Arc<dyn ImageClassifier>>,
    ) -> Self {
        let report_manager = Arc::new(ReportManager::new(
            store,
            config.policy.clone(),
            Duration::from_secs(config.storage.timeout_secs),
        ));

        let upload = Arc::new(UploadPipeline::new(
            ImageCompressor::new(&config.media),
            classifier,
            Arc::clone(&report_manager),
        ));

        Self {
            config: Arc::new(config),
            db,
            report_manager,
            upload,
        }
    }

    /// In-memory context for tests; classification always falls back
    pub async fn for_tests(config: ServerConfig) -> AlertResult<Self> {
        let db = db::connect_in_memory().await?;
        Ok(Self::with_parts(config, db, None))
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
