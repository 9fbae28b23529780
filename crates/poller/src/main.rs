use std::sync::Arc;
use std::time::Duration;

use hrdesk_common::config::AppConfig;
use hrdesk_common::types::Identity;
use hrdesk_engine::{NotificationAggregator, NotificationFeed, ReadStateStore};
use hrdesk_poller::FeedPoller;
use hrdesk_sources::FetcherRegistry;
use hrdesk_sources::http::HttpHrBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hrdesk_poller=info,hrdesk_engine=info".into()),
        )
        .json()
        .init();

    tracing::info!("HR Desk feed poller starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    let backend = Arc::new(HttpHrBackend::from_config(&config)?);
    let store = ReadStateStore::from_config(&config).await?;
    let aggregator = Arc::new(NotificationAggregator::new(
        FetcherRegistry::new(backend),
        store,
    ));
    let feed = Arc::new(NotificationFeed::new(aggregator));

    // Log every published snapshot
    let mut updates = feed.subscribe();
    let reporter = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.loading {
                continue;
            }
            tracing::info!(
                total = snapshot.notifications.len(),
                unread = snapshot.unread_count,
                "Feed updated"
            );
            for n in &snapshot.notifications {
                tracing::debug!(
                    id = %n.id,
                    category = %n.category,
                    read = n.read,
                    title = %n.title,
                    "Feed item"
                );
            }
        }
    });

    let mut poller = FeedPoller::new(
        feed,
        Duration::from_secs(config.feed_poll_interval_secs),
    );

    match Identity::from_parts(config.feed_user_id.as_deref(), config.feed_role) {
        Some(identity) => poller.start(identity),
        None => tracing::warn!("FEED_USER_ID and FEED_ROLE not both set, poller stays idle"),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, stopping gracefully...");

    poller.shutdown().await;
    reporter.abort();

    tracing::info!("HR Desk feed poller stopped.");
    Ok(())
}
