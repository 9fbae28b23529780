//! The consumer surface of one session: the current snapshot plus the
//! `mark_as_read`, `mark_all_read` and `refresh` entry points.
//!
//! Snapshots are published on a `watch` channel. Every identity change bumps
//! a session generation; a pass started under an older generation still runs
//! to completion but its result is discarded.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use hrdesk_common::types::{Caller, FeedSnapshot, Identity};

use crate::aggregator::NotificationAggregator;
use crate::read_state::ReadIds;

struct Session {
    /// Identity plus the credential passes are fetched with.
    caller: Option<Caller>,
    generation: u64,
    /// Ids acknowledged during this session. Overlaid on every published
    /// pass so that a pass which loaded read markers before a mark cannot
    /// flip the item back to unread.
    acknowledged: ReadIds,
    /// User-visible passes (identity change, manual refresh) in flight.
    loading_passes: usize,
}

/// A pass reserved by [`NotificationFeed::begin_pass`], bound to the
/// identity and generation current at reservation time.
#[derive(Debug, Clone)]
pub struct PassTicket {
    caller: Caller,
    generation: u64,
    loud: bool,
}

pub struct NotificationFeed {
    aggregator: Arc<NotificationAggregator>,
    session: Mutex<Session>,
    snapshot: watch::Sender<FeedSnapshot>,
    /// Serializes read-marker read-modify-write cycles.
    mutation: tokio::sync::Mutex<()>,
}

impl NotificationFeed {
    pub fn new(aggregator: Arc<NotificationAggregator>) -> Self {
        let (snapshot, _) = watch::channel(FeedSnapshot::default());
        Self {
            aggregator,
            session: Mutex::new(Session {
                caller: None,
                generation: 0,
                acknowledged: ReadIds::new(),
                loading_passes: 0,
            }),
            snapshot,
            mutation: tokio::sync::Mutex::new(()),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session().caller.as_ref().map(|c| c.identity.clone())
    }

    pub fn generation(&self) -> u64 {
        self.session().generation
    }

    /// Switch the session to `identity`, fetching without a credential of
    /// its own. See [`Self::set_caller`].
    pub fn set_identity(&self, identity: Option<Identity>) -> bool {
        self.set_caller(identity.map(Caller::new))
    }

    /// Switch the session to `caller`. Returns `false` when its identity is
    /// already current; the credential is still replaced for later passes.
    /// Otherwise the old feed is cleared and any pass still in flight for the
    /// previous identity becomes stale.
    pub fn set_caller(&self, caller: Option<Caller>) -> bool {
        let mut session = self.session();
        let identity = caller.as_ref().map(|c| &c.identity);
        if session.caller.as_ref().map(|c| &c.identity) == identity {
            session.caller = caller;
            return false;
        }

        session.generation += 1;
        session.caller = caller;
        session.acknowledged.clear();
        session.loading_passes = 0;
        self.snapshot.send_replace(FeedSnapshot::default());

        tracing::info!(
            user_id = session.caller.as_ref().map(|c| c.user_id()),
            role = session.caller.as_ref().map(|c| c.role().path_prefix()),
            generation = session.generation,
            "Feed identity changed"
        );
        true
    }

    /// Reserve a pass for the current identity. A loud pass marks the feed as
    /// loading until it completes. Returns `None` when there is no identity.
    pub fn begin_pass(&self, loud: bool) -> Option<PassTicket> {
        let mut session = self.session();
        let caller = session.caller.clone()?;

        if loud {
            session.loading_passes += 1;
            self.snapshot.send_modify(|s| s.loading = true);
        }

        Some(PassTicket {
            caller,
            generation: session.generation,
            loud,
        })
    }

    /// Reserve a background pass, but only while the session is still at
    /// `generation`. Poll schedules use this so that a schedule outliving its
    /// identity never polls for the next one.
    pub fn begin_scheduled_pass(&self, generation: u64) -> Option<PassTicket> {
        let session = self.session();
        if session.generation != generation {
            return None;
        }
        Some(PassTicket {
            caller: session.caller.clone()?,
            generation,
            loud: false,
        })
    }

    /// Aggregate for the ticket's identity and publish the result, unless the
    /// session moved on in the meantime. Returns whether it was published.
    pub async fn run_pass(&self, ticket: PassTicket) -> bool {
        let mut snapshot = self.aggregator.aggregate_for(&ticket.caller).await;

        let mut session = self.session();
        if session.generation != ticket.generation {
            tracing::debug!(
                user_id = %ticket.caller.user_id(),
                generation = ticket.generation,
                current = session.generation,
                "Discarding stale aggregation result"
            );
            return false;
        }

        for n in snapshot.notifications.iter_mut() {
            if session.acknowledged.contains(&n.id) {
                n.read = true;
            }
        }
        snapshot.recount();

        if ticket.loud {
            session.loading_passes = session.loading_passes.saturating_sub(1);
        }
        snapshot.loading = session.loading_passes > 0;

        self.snapshot.send_replace(snapshot);
        true
    }

    /// One immediate user-visible pass. Does not touch any poll schedule.
    pub async fn refresh(&self) -> bool {
        match self.begin_pass(true) {
            Some(ticket) => self.run_pass(ticket).await,
            None => false,
        }
    }

    /// One background pass; `loading` is left alone.
    pub async fn poll(&self) -> bool {
        match self.begin_pass(false) {
            Some(ticket) => self.run_pass(ticket).await,
            None => false,
        }
    }

    /// Mark one item read: flipped in memory immediately, then persisted.
    pub async fn mark_as_read(&self, id: &str) {
        let _guard = self.mutation.lock().await;

        let user_id = {
            let mut session = self.session();
            let Some(user_id) = session.caller.as_ref().map(|c| c.user_id().to_string()) else {
                return;
            };
            session.acknowledged.insert(id.to_string());
            self.snapshot.send_modify(|s| {
                for n in s.notifications.iter_mut().filter(|n| n.id == id) {
                    n.read = true;
                }
                s.recount();
            });
            user_id
        };

        let store = self.aggregator.read_state();
        let mut persisted = store.get_read_ids(&user_id).await;
        if persisted.insert(id.to_string()) {
            store.save_read_ids(&user_id, &persisted).await;
        }
    }

    /// Mark every item currently in the feed read. Items that show up in a
    /// later pass are not affected.
    pub async fn mark_all_read(&self) {
        let _guard = self.mutation.lock().await;

        let (user_id, visible) = {
            let mut session = self.session();
            let Some(user_id) = session.caller.as_ref().map(|c| c.user_id().to_string()) else {
                return;
            };
            let visible: Vec<String> = self
                .snapshot
                .borrow()
                .notifications
                .iter()
                .map(|n| n.id.clone())
                .collect();
            session.acknowledged.extend(visible.iter().cloned());
            self.snapshot.send_modify(|s| {
                for n in s.notifications.iter_mut() {
                    n.read = true;
                }
                s.recount();
            });
            (user_id, visible)
        };

        if visible.is_empty() {
            return;
        }

        let store = self.aggregator.read_state();
        let mut persisted = store.get_read_ids(&user_id).await;
        let before = persisted.len();
        persisted.extend(visible);
        if persisted.len() != before {
            store.save_read_ids(&user_id, &persisted).await;
        }
    }
}
