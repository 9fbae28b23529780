//! One aggregation pass: fan out to every applicable source, merge, overlay
//! read markers and sort.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use hrdesk_common::types::{Caller, FeedSnapshot, Identity, Notification, Role};
use hrdesk_sources::error::SourceError;
use hrdesk_sources::{FetcherRegistry, SourceFetcher};

use crate::read_state::{ReadIds, ReadStateStore};

/// Failure policy for a single source: a failed source contributes nothing
/// and the pass carries on.
pub fn fail_closed(source: &str, result: Result<Vec<Notification>, SourceError>) -> Vec<Notification> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(source, error = %e, "Source fetch failed, contributing no items");
            Vec::new()
        }
    }
}

/// Mark every item whose id is in `read_ids` as read.
pub fn overlay_read(notifications: &mut [Notification], read_ids: &ReadIds) {
    for n in notifications.iter_mut() {
        n.read = read_ids.contains(&n.id);
    }
}

/// Builds feed snapshots from the registered sources and the read-state store.
///
/// Holds no per-user state, so one aggregator can serve every session.
pub struct NotificationAggregator {
    registry: FetcherRegistry,
    read_state: ReadStateStore,
}

impl NotificationAggregator {
    pub fn new(registry: FetcherRegistry, read_state: ReadStateStore) -> Self {
        Self {
            registry,
            read_state,
        }
    }

    pub fn read_state(&self) -> &ReadStateStore {
        &self.read_state
    }

    /// Run one pass for `(user_id, role)`. Never fails; an absent identity
    /// yields the empty feed. The backend is called without a per-user
    /// credential; sessions go through [`Self::aggregate_for`].
    pub async fn aggregate(&self, user_id: Option<&str>, role: Option<Role>) -> FeedSnapshot {
        match Identity::from_parts(user_id, role) {
            Some(identity) => self.aggregate_for(&Caller::new(identity)).await,
            None => FeedSnapshot::default(),
        }
    }

    /// Run one pass on `caller`'s behalf.
    pub async fn aggregate_for(&self, caller: &Caller) -> FeedSnapshot {
        let read_ids = self.read_state.get_read_ids(caller.user_id()).await;
        let mut notifications = self.collect(caller, Utc::now()).await;
        overlay_read(&mut notifications, &read_ids);

        let snapshot = FeedSnapshot::new(notifications);
        tracing::debug!(
            user_id = %caller.user_id(),
            role = %caller.role(),
            total = snapshot.notifications.len(),
            unread = snapshot.unread_count,
            "Aggregation pass complete"
        );
        snapshot
    }

    /// Fetch every source applicable to the caller's role concurrently, then
    /// merge: per-source caps enforced, duplicates dropped (first occurrence
    /// wins), stable sort newest first. Items come back unread.
    pub async fn collect(&self, caller: &Caller, now: DateTime<Utc>) -> Vec<Notification> {
        let fetchers: Vec<&dyn SourceFetcher> = self.registry.applicable(caller.role()).collect();
        let results = join_all(fetchers.iter().map(|f| f.fetch(caller, now))).await;

        let mut seen = HashSet::new();
        let mut merged = Vec::new();

        for (fetcher, result) in fetchers.iter().zip(results) {
            let mut items = fail_closed(fetcher.name(), result);

            if items.len() > fetcher.cap() {
                tracing::warn!(
                    source = fetcher.name(),
                    returned = items.len(),
                    cap = fetcher.cap(),
                    "Source exceeded its cap, truncating"
                );
                items.truncate(fetcher.cap());
            }

            for item in items {
                if seen.insert(item.id.clone()) {
                    merged.push(item);
                }
            }
        }

        // `sort_by` is stable: equal timestamps keep source order.
        merged.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        merged
    }
}
