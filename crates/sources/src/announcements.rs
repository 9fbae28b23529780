use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrdesk_common::types::{Caller, Notification, NotificationCategory, Role};

use crate::SourceFetcher;
use crate::backend::HrBackend;
use crate::dto::{AnnouncementRecord, most_recent};
use crate::error::SourceError;
use crate::format::{MESSAGE_PREVIEW_CHARS, nav, or_default, preview};

/// Announcements contributed per pass.
pub const ANNOUNCEMENT_CAP: usize = 5;

/// Company announcements, visible to every role.
pub struct AnnouncementFetcher {
    backend: Arc<dyn HrBackend>,
}

impl AnnouncementFetcher {
    pub fn new(backend: Arc<dyn HrBackend>) -> Self {
        Self { backend }
    }
}

/// Map an announcement record into a feed item.
///
/// Defaults: title "New announcement", message "A new announcement has been
/// posted", time falls back to `now`.
pub fn announcement_notification(
    record: &AnnouncementRecord,
    role: Role,
    now: DateTime<Utc>,
) -> Notification {
    let body = or_default(
        record.content.as_deref(),
        "A new announcement has been posted",
    );

    Notification {
        id: format!("ann_{}", record.id),
        category: NotificationCategory::Announcement,
        title: or_default(record.title.as_deref(), "New announcement"),
        message: preview(&body, MESSAGE_PREVIEW_CHARS),
        occurred_at: record.created_at.unwrap_or(now),
        read: false,
        navigation_target: nav(role, "announcements"),
    }
}

#[async_trait]
impl SourceFetcher for AnnouncementFetcher {
    fn name(&self) -> &'static str {
        "announcements"
    }

    fn applies_to(&self, _role: Role) -> bool {
        true
    }

    fn cap(&self) -> usize {
        ANNOUNCEMENT_CAP
    }

    async fn fetch(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, SourceError> {
        let role = caller.role();
        let records = self.backend.list_announcements(caller).await?;
        Ok(most_recent(records, ANNOUNCEMENT_CAP)
            .iter()
            .map(|r| announcement_notification(r, role, now))
            .collect())
    }
}
