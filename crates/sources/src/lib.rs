pub mod announcements;
pub mod attendance;
pub mod backend;
pub mod chat;
pub mod dto;
pub mod error;
pub mod expense;
pub mod fake;
pub mod format;
pub mod http;
pub mod leave;
pub mod pending;


use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrdesk_common::types::{Caller, Notification, Role};

use crate::backend::HrBackend;
use crate::error::SourceError;

/// One feed source: calls a collaborator API and maps its records into
/// feed items for the given role.
///
/// Implementations return their error instead of swallowing it; the
/// aggregator decides what a failed source contributes.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Stable name used in logs (e.g., "leave_decisions").
    fn name(&self) -> &'static str;

    /// Whether this source is polled for `role`.
    fn applies_to(&self, role: Role) -> bool;

    /// Maximum number of items contributed per pass.
    fn cap(&self) -> usize;

    /// Fetch and map this source's most recent items on `caller`'s behalf.
    /// `now` is the pass time, used for records that carry no timestamp of
    /// their own.
    async fn fetch(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, SourceError>;
}

/// Registry of all feed sources, consulted by the aggregator on every pass.
pub struct FetcherRegistry {
    fetchers: Vec<Box<dyn SourceFetcher>>,
}

impl FetcherRegistry {
    /// All six sources backed by `backend`, in feed emission order.
    pub fn new(backend: Arc<dyn HrBackend>) -> Self {
        Self {
            fetchers: vec![
                Box::new(announcements::AnnouncementFetcher::new(backend.clone())),
                Box::new(chat::ChatUnreadFetcher::new(backend.clone())),
                Box::new(leave::LeaveDecisionFetcher::new(backend.clone())),
                Box::new(expense::ExpenseDecisionFetcher::new(backend.clone())),
                Box::new(attendance::AttendanceEditDecisionFetcher::new(
                    backend.clone(),
                )),
                Box::new(pending::PendingLeaveFetcher::new(backend.clone())),
                Box::new(pending::PendingAttendanceEditFetcher::new(backend)),
            ],
        }
    }

    /// A registry over an explicit list of sources.
    pub fn with_fetchers(fetchers: Vec<Box<dyn SourceFetcher>>) -> Self {
        Self { fetchers }
    }

    /// Sources polled for `role`, in registration order.
    pub fn applicable(&self, role: Role) -> impl Iterator<Item = &dyn SourceFetcher> + '_ {
        self.fetchers
            .iter()
            .map(|f| f.as_ref())
            .filter(move |f| f.applies_to(role))
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}
