use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use hrdesk_common::types::{Caller, Identity};
use hrdesk_engine::NotificationFeed;

/// Default re-aggregation interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// A running poll schedule: one immediate pass, then one pass per interval.
struct Schedule {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the poll schedule of one feed session.
///
/// Idle while the feed has no identity, Polling otherwise. Every identity
/// change cancels the running schedule before a new one starts, so at most
/// one schedule exists per poller.
pub struct FeedPoller {
    feed: Arc<NotificationFeed>,
    interval: Duration,
    schedule: Option<Schedule>,
}

impl FeedPoller {
    pub fn new(feed: Arc<NotificationFeed>, interval: Duration) -> Self {
        Self {
            feed,
            interval,
            schedule: None,
        }
    }

    pub fn feed(&self) -> &Arc<NotificationFeed> {
        &self.feed
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_polling(&self) -> bool {
        self.schedule.is_some()
    }

    /// Idle → Polling for `identity`.
    pub fn start(&mut self, identity: Identity) {
        self.set_identity(Some(identity));
    }

    /// Polling → Idle. The feed is cleared.
    pub fn stop(&mut self) {
        self.set_identity(None);
    }

    /// Follow an identity change, polling without a per-user credential.
    pub fn set_identity(&mut self, identity: Option<Identity>) {
        self.set_caller(identity.map(Caller::new));
    }

    /// Follow a caller change. When the caller's identity is already being
    /// polled only its credential is replaced; otherwise the old schedule is
    /// cancelled and, for a present caller, a new one starts with an
    /// immediate pass.
    pub fn set_caller(&mut self, caller: Option<Caller>) {
        let identity = caller.as_ref().map(|c| c.identity.clone());
        if self.feed.identity() == identity && self.is_polling() == identity.is_some() {
            self.feed.set_caller(caller);
            return;
        }

        self.cancel_schedule();
        self.feed.set_caller(caller);

        match identity {
            Some(identity) => self.spawn_schedule(identity),
            None => tracing::info!("Feed poller idle"),
        }
    }

    /// One out-of-band pass. The schedule keeps its cadence.
    pub async fn refresh(&self) -> bool {
        self.feed.refresh().await
    }

    /// Stop polling and wait for the schedule task to exit.
    pub async fn shutdown(mut self) {
        if let Some(schedule) = self.schedule.take() {
            let _ = schedule.shutdown.send(true);
            if let Err(e) = schedule.handle.await {
                tracing::warn!(error = %e, "Poll schedule task failed");
            }
        }
        self.feed.set_identity(None);
        tracing::info!("Feed poller shut down");
    }

    fn cancel_schedule(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            // The in-flight pass, if any, finishes and is discarded as stale.
            let _ = schedule.shutdown.send(true);
        }
    }

    fn spawn_schedule(&mut self, identity: Identity) {
        let feed = self.feed.clone();
        let interval = self.interval;
        let generation = feed.generation();
        let first = feed.begin_pass(true);
        let first_tick = Instant::now() + interval;
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        tracing::info!(
            user_id = %identity.user_id,
            role = %identity.role,
            interval_secs = interval.as_secs(),
            "Feed poller started"
        );

        let handle = tokio::spawn(async move {
            if let Some(ticket) = first {
                feed.run_pass(ticket).await;
            }

            let mut ticker = tokio::time::interval_at(first_tick, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        let Some(ticket) = feed.begin_scheduled_pass(generation) else {
                            break;
                        };
                        feed.run_pass(ticket).await;
                    }
                }
            }

            tracing::debug!(generation, "Poll schedule ended");
        });

        self.schedule = Some(Schedule { shutdown, handle });
    }
}
