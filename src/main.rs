//! commons-market server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use commons_market::api;
use commons_market::app_state::AppState;
use commons_market::config::{LogFormat, MarketConfig};
use commons_market::domain::EventBus;
use commons_market::membership::{InMemoryDirectory, MembershipDirectory};
use commons_market::persistence::{PostgresPersistence, spawn_event_log_writer};
use commons_market::service::MarketService;
use commons_market::store::MarketStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config =
        MarketConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting commons-market");

    // Membership directory
    let directory = match &config.member_directory_path {
        Some(path) => InMemoryDirectory::from_json_file(path)
            .await
            .with_context(|| format!("loading member directory {}", path.display()))?,
        None => {
            tracing::warn!("MEMBER_DIRECTORY_PATH not set, starting with an empty directory");
            InMemoryDirectory::new()
        }
    };
    let directory: Arc<dyn MembershipDirectory> = Arc::new(directory);

    // Domain and service layers
    let event_bus = EventBus::new(config.event_bus_capacity);
    let service = Arc::new(MarketService::new(
        Arc::new(MarketStore::new()),
        directory,
        Arc::new(config.fee_schedule.clone()),
        event_bus.clone(),
    ));

    let mut app_state = AppState::new(service);
    if let Some(secret) = config.payment_webhook_secret.as_deref() {
        app_state = app_state.with_webhook_secret(secret);
    } else {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET not set, payment webhooks are disabled");
    }

    // Optional event log
    let mut writer = None;
    if config.persistence_enabled {
        let persistence = PostgresPersistence::connect(&config)
            .await
            .context("connecting to the event log database")?;
        if config.event_log_enabled {
            writer = Some(spawn_event_log_writer(persistence.clone(), &event_bus));
        }
        app_state = app_state.with_persistence(persistence);
    }

    let app = api::build_app(app_state, Duration::from_secs(config.request_timeout_secs));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = writer {
        writer.abort();
    }
    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Plain => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
