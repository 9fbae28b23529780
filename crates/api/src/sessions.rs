//! One feed session per signed-in user.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use hrdesk_common::types::Caller;
use hrdesk_engine::{NotificationAggregator, NotificationFeed};
use hrdesk_poller::FeedPoller;

struct Session {
    poller: FeedPoller,
    last_seen: Instant,
}

/// Keeps a `FeedPoller` (and through it a `NotificationFeed`) per user id.
///
/// Sessions open on a user's first request and keep polling until ended or
/// until no request has touched them for `idle_ttl`. A request carrying a
/// different role for the same user re-keys the session: the old schedule
/// is cancelled and the feed starts over. A request carrying a new backend
/// credential only replaces the credential.
pub struct SessionRegistry {
    aggregator: Arc<NotificationAggregator>,
    poll_interval: Duration,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(
        aggregator: Arc<NotificationAggregator>,
        poll_interval: Duration,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            aggregator,
            poll_interval,
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// The feed for `caller`, opening or re-keying its session as needed.
    pub async fn feed_for(&self, caller: &Caller) -> Arc<NotificationFeed> {
        let mut sessions = self.sessions.lock().await;

        let session = sessions
            .entry(caller.user_id().to_string())
            .or_insert_with(|| {
                tracing::info!(user_id = %caller.user_id(), "Opening feed session");
                let feed = Arc::new(NotificationFeed::new(self.aggregator.clone()));
                Session {
                    poller: FeedPoller::new(feed, self.poll_interval),
                    last_seen: Instant::now(),
                }
            });
        session.last_seen = Instant::now();
        session.poller.set_caller(Some(caller.clone()));

        session.poller.feed().clone()
    }

    /// End `user_id`'s session. Returns `false` if there was none.
    pub async fn end(&self, user_id: &str) -> bool {
        let session = self.sessions.lock().await.remove(user_id);

        match session {
            Some(session) => {
                session.poller.shutdown().await;
                tracing::info!(user_id, "Feed session ended");
                true
            }
            None => false,
        }
    }

    /// End every session idle for at least `idle_ttl`. Returns how many.
    pub async fn reap_idle(&self) -> usize {
        let now = Instant::now();
        let idle: Vec<(String, Session)> = {
            let mut sessions = self.sessions.lock().await;
            let expired: Vec<String> = sessions
                .iter()
                .filter(|(_, s)| now.duration_since(s.last_seen) >= self.idle_ttl)
                .map(|(user_id, _)| user_id.clone())
                .collect();
            expired
                .into_iter()
                .filter_map(|user_id| sessions.remove(&user_id).map(|s| (user_id, s)))
                .collect()
        };

        let count = idle.len();
        for (user_id, session) in idle {
            session.poller.shutdown().await;
            tracing::info!(user_id = %user_id, "Idle feed session ended");
        }
        count
    }

    /// Run [`Self::reap_idle`] every half `idle_ttl` until aborted.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = (registry.idle_ttl / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reaped = registry.reap_idle().await;
                if reaped > 0 {
                    tracing::debug!(reaped, "Reaped idle feed sessions");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// End every session; used on server shutdown.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<Session> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();

        let count = sessions.len();
        for session in sessions {
            session.poller.shutdown().await;
        }
        tracing::info!(sessions = count, "All feed sessions ended");
    }
}
