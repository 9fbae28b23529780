use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrdesk_common::types::{Caller, Notification, NotificationCategory, Role};

use crate::SourceFetcher;
use crate::backend::HrBackend;
use crate::error::SourceError;
use crate::format::nav;

/// Id of the single synthetic chat item. A new unread message refreshes
/// this item's count instead of minting a new id.
pub const CHAT_UNREAD_ID: &str = "chat_unread_bulk";

/// Unread chat messages, folded into at most one item per pass.
pub struct ChatUnreadFetcher {
    backend: Arc<dyn HrBackend>,
}

impl ChatUnreadFetcher {
    pub fn new(backend: Arc<dyn HrBackend>) -> Self {
        Self { backend }
    }

    /// Ask the unread-count endpoint first. When it says zero, or fails,
    /// sum the per-room counters instead.
    async fn total_unread(&self, caller: &Caller) -> Result<u64, SourceError> {
        match self.backend.chat_unread_count(caller).await {
            Ok(count) if count > 0 => return Ok(count),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Chat unread-count endpoint failed, summing rooms");
            }
        }

        let rooms = self.backend.list_chat_rooms(caller).await?;
        Ok(rooms
            .iter()
            .map(|room| room.unread_count)
            .fold(0u64, u64::saturating_add))
    }
}

/// The bulk chat item for `unread` messages, or `None` when nothing is unread.
pub fn chat_notification(unread: u64, role: Role, now: DateTime<Utc>) -> Option<Notification> {
    if unread == 0 {
        return None;
    }

    let noun = if unread == 1 { "message" } else { "messages" };
    Some(Notification {
        id: CHAT_UNREAD_ID.to_string(),
        category: NotificationCategory::Chat,
        title: "Unread messages".to_string(),
        message: format!("You have {} unread {}", unread, noun),
        occurred_at: now,
        read: false,
        navigation_target: nav(role, "chat"),
    })
}

#[async_trait]
impl SourceFetcher for ChatUnreadFetcher {
    fn name(&self) -> &'static str {
        "chat_unread"
    }

    fn applies_to(&self, _role: Role) -> bool {
        true
    }

    fn cap(&self) -> usize {
        1
    }

    async fn fetch(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, SourceError> {
        let role = caller.role();
        let unread = self.total_unread(caller).await?;
        Ok(chat_notification(unread, role, now).into_iter().collect())
    }
}
