//! Application startup and lifecycle management.

use crate::config::RenewalConfig;
use crate::hooks::HookRegistry;
use crate::services::{init_metrics, RenewActive, SubscriptionHost};
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::sync::Arc;

/// Install logging and register metrics. Call once per process.
pub fn bootstrap(config: &RenewalConfig) -> Result<(), AppError> {
    init_tracing(
        &config.service_name,
        &config.log_level,
        config.common.json_logs,
    )?;
    init_metrics();

    tracing::info!(
        service_name = %config.service_name,
        version = %config.service_version,
        expiry_tolerance_secs = config.schedule.expiry_tolerance_secs,
        max_catch_up_iterations = config.schedule.max_catch_up_iterations,
        date_format = %config.display.date_format,
        "Configuration loaded"
    );

    Ok(())
}

/// Renewal handlers bound to a host store.
pub struct Application {
    config: RenewalConfig,
    handlers: Arc<RenewActive>,
}

impl Application {
    pub fn build(
        config: RenewalConfig,
        host: Arc<dyn SubscriptionHost>,
        hooks: HookRegistry,
    ) -> Result<Self, AppError> {
        let handlers = Arc::new(RenewActive::from_config(host, hooks, &config)?);
        init_metrics();

        tracing::info!(hooks = ?handlers.hooks(), "Renewal handlers registered");

        Ok(Self { config, handlers })
    }

    pub fn config(&self) -> &RenewalConfig {
        &self.config
    }

    pub fn handlers(&self) -> Arc<RenewActive> {
        Arc::clone(&self.handlers)
    }
}
