/// Configuration management for the cattle alert service
use crate::error::{AlertError, AlertResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
    pub location: LocationConfig,
    pub media: MediaConfig,
    pub classifier: ClassifierConfig,
    pub admin: AdminConfig,
    pub jobs: JobsConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Request body ceiling for raw image uploads
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    /// Per-call timeout against the report store, in seconds
    pub timeout_secs: u64,
}

/// Report lifecycle policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Downvote count at which a report is removed
    pub downvote_threshold: u32,
    /// Age after which the sweep removes a report
    pub retention_hours: u64,
    /// Ceiling for the inline image reference; larger images are dropped
    pub max_image_bytes: usize,
}

impl PolicyConfig {
    /// Retention window in milliseconds, `None` when it does not fit an `i64`
    pub fn checked_retention_millis(&self) -> Option<i64> {
        i64::try_from(self.retention_hours)
            .ok()
            .and_then(|hours| hours.checked_mul(60 * 60 * 1000))
    }

    /// Retention window in milliseconds, saturating instead of wrapping
    pub fn retention_millis(&self) -> i64 {
        self.checked_retention_millis().unwrap_or(i64::MAX)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            downvote_threshold: 100,
            retention_hours: 24,
            max_image_bytes: 1_000_000,
        }
    }
}

/// Fallback position and nearby radius
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub default_radius_km: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_latitude: 37.7749,
            default_longitude: -122.4194,
            default_radius_km: 10.0,
        }
    }
}

/// Upload compression targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub max_dimension: u32,
    pub target_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1200,
            target_bytes: 512 * 1024,
        }
    }
}

/// Image classification service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Without a key every upload uses the fallback analysis
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 20,
        }
    }
}

/// Administrative endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub cron_secret: String,
}

/// In-process job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Zero leaves the sweep to an external trigger
    pub sweep_interval_secs: u64,
}

fn var_or<T: FromStr>(key: &str, default: T) -> AlertResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AlertError::Validation(format!("Invalid value for {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AlertResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("ALERT_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = var_or("ALERT_PORT", 3000u16)?;
        let upload_limit = var_or("ALERT_UPLOAD_LIMIT", 10 * 1024 * 1024usize)?;

        let data_directory: PathBuf = env::var("ALERT_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("ALERT_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("reports.sqlite"));
        let store_timeout = var_or("ALERT_STORE_TIMEOUT_SECS", 5u64)?;

        let policy_defaults = PolicyConfig::default();
        let policy = PolicyConfig {
            downvote_threshold: var_or("ALERT_DOWNVOTE_THRESHOLD", policy_defaults.downvote_threshold)?,
            retention_hours: var_or("ALERT_RETENTION_HOURS", policy_defaults.retention_hours)?,
            max_image_bytes: var_or("ALERT_MAX_IMAGE_BYTES", policy_defaults.max_image_bytes)?,
        };

        let location_defaults = LocationConfig::default();
        let location = LocationConfig {
            default_latitude: var_or("ALERT_DEFAULT_LATITUDE", location_defaults.default_latitude)?,
            default_longitude: var_or("ALERT_DEFAULT_LONGITUDE", location_defaults.default_longitude)?,
            default_radius_km: var_or("ALERT_DEFAULT_RADIUS_KM", location_defaults.default_radius_km)?,
        };

        let media_defaults = MediaConfig::default();
        let media = MediaConfig {
            max_dimension: var_or("ALERT_COMPRESS_MAX_DIMENSION", media_defaults.max_dimension)?,
            target_bytes: var_or("ALERT_COMPRESS_TARGET_BYTES", media_defaults.target_bytes)?,
        };

        let classifier_defaults = ClassifierConfig::default();
        let classifier = ClassifierConfig {
            api_key: env::var("GOOGLE_GENERATIVE_AI_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: env::var("ALERT_CLASSIFIER_MODEL").unwrap_or(classifier_defaults.model),
            endpoint: env::var("ALERT_CLASSIFIER_ENDPOINT").unwrap_or(classifier_defaults.endpoint),
            timeout_secs: var_or("ALERT_CLASSIFIER_TIMEOUT_SECS", classifier_defaults.timeout_secs)?,
        };

        let cron_secret = env::var("CRON_SECRET").unwrap_or_else(|_| "dev-secret".to_string());
        let sweep_interval_secs = var_or("ALERT_SWEEP_INTERVAL_SECS", 0u64)?;

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version: env!("CARGO_PKG_VERSION").to_string(),
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                timeout_secs: store_timeout,
            },
            policy,
            location,
            media,
            classifier,
            admin: AdminConfig { cron_secret },
            jobs: JobsConfig { sweep_interval_secs },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AlertResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AlertError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.policy.downvote_threshold == 0 {
            return Err(AlertError::Validation(
                "Downvote threshold must be at least 1".to_string(),
            ));
        }

        if self.policy.retention_hours == 0 {
            return Err(AlertError::Validation(
                "Retention window must be at least one hour".to_string(),
            ));
        }

        if self.policy.checked_retention_millis().is_none() {
            return Err(AlertError::Validation(format!(
                "Retention window of {} hours is too large",
                self.policy.retention_hours
            )));
        }

        if self.policy.max_image_bytes == 0 {
            return Err(AlertError::Validation(
                "Image size ceiling cannot be zero".to_string(),
            ));
        }

        if !(self.location.default_radius_km > 0.0) {
            return Err(AlertError::Validation(
                "Default radius must be positive".to_string(),
            ));
        }

        if self.admin.cron_secret == "dev-secret" {
            tracing::warn!("CRON_SECRET not set, using the development secret");
        }

        Ok(())
    }

    /// Configuration suitable for tests: in-memory friendly paths, defaults elsewhere
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                version: env!("CARGO_PKG_VERSION").to_string(),
                upload_limit: 10 * 1024 * 1024,
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from("./data/reports.sqlite"),
                timeout_secs: 5,
            },
            policy: PolicyConfig::default(),
            location: LocationConfig::default(),
            media: MediaConfig::default(),
            classifier: ClassifierConfig::default(),
            admin: AdminConfig {
                cron_secret: "test-secret".to_string(),
            },
            jobs: JobsConfig {
                sweep_interval_secs: 0,
            },
        }
    }
}
