use std::env;
use std::fmt;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the lifecycle engine and its worker.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub retention: RetentionSettings,
    pub cv_worker: CvWorkerSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let audit_retention_days = env::var("APP_AUDIT_RETENTION_DAYS")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidRetentionDays)?;

        // Negative counts collapse to "disabled", matching the day rule.
        let audit_max_entries = env::var("APP_AUDIT_MAX_ENTRIES")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidMaxEntries)?
            .max(0) as usize;

        let poll_interval_secs = env::var("APP_CV_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidPollInterval)?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            retention: RetentionSettings {
                audit_retention_days,
                audit_max_entries,
            },
            cv_worker: CvWorkerSettings { poll_interval_secs },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Audit retention knobs; non-positive values disable the respective rule.
#[derive(Debug, Clone, Copy)]
pub struct RetentionSettings {
    pub audit_retention_days: i64,
    pub audit_max_entries: usize,
}

/// CV worker cadence knobs.
#[derive(Debug, Clone, Copy)]
pub struct CvWorkerSettings {
    pub poll_interval_secs: u64,
}

impl CvWorkerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidRetentionDays,
    InvalidMaxEntries,
    InvalidPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRetentionDays => {
                write!(f, "APP_AUDIT_RETENTION_DAYS must be a whole number of days")
            }
            ConfigError::InvalidMaxEntries => {
                write!(f, "APP_AUDIT_MAX_ENTRIES must be a whole number of entries")
            }
            ConfigError::InvalidPollInterval => {
                write!(
                    f,
                    "APP_CV_POLL_INTERVAL_SECS must be a positive number of seconds"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
