mod bootstrap;
mod health;
mod routes;

use std::time::Duration;

use anyhow::Result;
use daybrief_core::config::{AppConfig, LoadOptions};
use tracing::{info, warn};

fn init_logging(config: &AppConfig) {
    use daybrief_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let router = routes::router(app.state.clone());

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        event_name = "system.server.started",
        bind_address = %address,
        backend = %app.config.backend.base_url,
        "daybrief-server started"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    info!(event_name = "system.server.stopping", "daybrief-server stopping");
    let _ = shutdown_tx.send(());

    let drain = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(drain, server).await {
        Ok(join_result) => join_result??,
        Err(_) => {
            warn!(
                event_name = "system.server.drain_timeout",
                drain_secs = drain.as_secs(),
                "graceful shutdown deadline exceeded, dropping open connections"
            );
        }
    }

    Ok(())
}
