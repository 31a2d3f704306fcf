use anyhow::{Context, Result};
use intake_service::web::start_api_server;
use intake_service::{AppState, Config, PgTicketStore, S3PhotoStore, SubmissionPipeline};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting Repair Intake Service"
    );

    init_metrics(config.service.metrics_port)?;

    let ticket_store = Arc::new(
        PgTicketStore::new(&config.database)
            .await
            .context("Failed to initialize ticket store")?,
    );

    if config.database.run_migrations {
        ticket_store
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    let photo_store = Arc::new(
        S3PhotoStore::new(&config.storage)
            .await
            .context("Failed to initialize photo store")?,
    );

    let pipeline = SubmissionPipeline::new(photo_store, ticket_store, config.storage.key_prefix.clone());

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    start_api_server(state, &config.api, shutdown_signal()).await?;

    info!("Intake service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Shutting down intake service");
}
