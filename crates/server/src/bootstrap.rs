use std::sync::Arc;

use chrono::Duration;
use daybrief_agent::{Dispatcher, Scheduler, ToolRegistry};
use daybrief_core::config::{AppConfig, ConfigError, LoadOptions};
use daybrief_core::AvailabilityEngine;
use daybrief_gateway::{BackendClient, GatewayError};
use thiserror::Error;
use tracing::info;

use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let backend = Arc::new(BackendClient::from_config(&config.backend)?);
    let dispatcher = Arc::new(Dispatcher::new(
        ToolRegistry::builtin(),
        backend.clone(),
        config.dispatch.clone(),
    ));
    let engine =
        AvailabilityEngine::with_granularity(Duration::minutes(config.schedule.granularity_minutes));
    let scheduler = Arc::new(Scheduler::new(dispatcher.clone(), engine));

    info!(
        event_name = "system.bootstrap.ready",
        backend = %config.backend.base_url,
        max_concurrency = config.dispatch.max_concurrency,
        "application components wired"
    );

    Ok(Application { config, state: AppState { dispatcher, scheduler, backend } })
}
