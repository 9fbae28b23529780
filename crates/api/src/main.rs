//! HR Desk notification API server binary entrypoint.

use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use hrdesk_common::config::AppConfig;
use hrdesk_engine::{NotificationAggregator, ReadStateStore};
use hrdesk_sources::FetcherRegistry;
use hrdesk_sources::http::HttpHrBackend;

use hrdesk_api::routes::create_router;
use hrdesk_api::sessions::SessionRegistry;
use hrdesk_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("hrdesk_api=debug,hrdesk_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting HR Desk notification API server...");

    // Load configuration
    let config = AppConfig::from_env()?;
    config.require_jwt_secret()?;

    // Collaborator client and read-state store. Each caller's own HR token
    // is forwarded; HR_API_TOKEN is never used on a caller's behalf.
    if config.hr_api_token.is_some() {
        tracing::warn!("HR_API_TOKEN is set but ignored by the API server");
    }
    let backend = Arc::new(HttpHrBackend::per_caller(&config)?);
    let store = ReadStateStore::from_config(&config).await?;
    let aggregator = Arc::new(NotificationAggregator::new(
        FetcherRegistry::new(backend),
        store,
    ));

    // Build application state
    let sessions = Arc::new(SessionRegistry::new(
        aggregator,
        Duration::from_secs(config.feed_poll_interval_secs),
        Duration::from_secs(config.feed_session_idle_secs),
    ));
    let reaper = sessions.spawn_reaper();
    let state = AppState::new(sessions.clone(), config.clone());

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.api_bind_addr).await?;
    tracing::info!("API server listening on {}", config.api_bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    reaper.abort();
    sessions.shutdown_all().await;
    tracing::info!("API server stopped.");
    Ok(())
}
