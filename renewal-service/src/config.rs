//! Configuration module for renewal-service.

use crate::schedule::{
    ScheduleLimits, DEFAULT_EXPIRY_TOLERANCE_SECS, DEFAULT_MAX_CATCH_UP_ITERATIONS,
};
use chrono::format::{Item, StrftimeItems};
use chrono::Duration;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Default display format for dates shown to customers, e.g. "February 28, 2013".
pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

#[derive(Debug, Clone)]
pub struct RenewalConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub schedule: ScheduleConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub expiry_tolerance_secs: i64,
    pub max_catch_up_iterations: u32,
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub date_format: String,
}

/// `RENEWAL__*` environment block.
#[derive(Debug, Deserialize)]
struct RenewalSettings {
    #[serde(default = "default_expiry_tolerance_secs")]
    expiry_tolerance_secs: i64,
    #[serde(default = "default_max_catch_up_iterations")]
    max_catch_up_iterations: u32,
    #[serde(default = "default_date_format")]
    date_format: String,
}

fn default_expiry_tolerance_secs() -> i64 {
    DEFAULT_EXPIRY_TOLERANCE_SECS
}

fn default_max_catch_up_iterations() -> u32 {
    DEFAULT_MAX_CATCH_UP_ITERATIONS
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            expiry_tolerance_secs: default_expiry_tolerance_secs(),
            max_catch_up_iterations: default_max_catch_up_iterations(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
        }
    }
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            service_name: "renewal-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            schedule: ScheduleConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl RenewalConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let common = core_config::Config::load()?;
        let settings: RenewalSettings = core_config::load_prefixed("RENEWAL")?;

        let config = Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "renewal-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            schedule: ScheduleConfig {
                expiry_tolerance_secs: settings.expiry_tolerance_secs,
                max_catch_up_iterations: settings.max_catch_up_iterations,
            },
            display: DisplayConfig {
                date_format: settings.date_format,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later, mid-request.
    pub fn validate(&self) -> Result<(), AppError> {
        if StrftimeItems::new(&self.display.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Invalid date format: {}",
                self.display.date_format
            )));
        }

        self.limits().map(|_| ())
    }

    pub fn limits(&self) -> Result<ScheduleLimits, AppError> {
        let secs = self.schedule.expiry_tolerance_secs;
        let expiry_tolerance = Duration::try_seconds(secs)
            .filter(|_| secs >= 0)
            .ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("Expiry tolerance out of range: {}", secs))
            })?;

        Ok(ScheduleLimits {
            expiry_tolerance,
            max_catch_up_iterations: self.schedule.max_catch_up_iterations,
        })
    }
}
