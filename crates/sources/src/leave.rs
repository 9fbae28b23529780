use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrdesk_common::types::{Caller, Notification, NotificationCategory, Role};

use crate::SourceFetcher;
use crate::backend::HrBackend;
use crate::dto::{DecisionStatus, LeaveRecord, most_recent};
use crate::error::SourceError;
use crate::format::{date_range, nav, or_default};

/// Resolved leave requests contributed per pass.
pub const LEAVE_DECISION_CAP: usize = 5;

/// Approvals and rejections of the user's own leave requests.
pub struct LeaveDecisionFetcher {
    backend: Arc<dyn HrBackend>,
}

impl LeaveDecisionFetcher {
    pub fn new(backend: Arc<dyn HrBackend>) -> Self {
        Self { backend }
    }
}

/// Map a resolved leave request. Pending and unknown statuses yield `None`.
pub fn leave_decision_notification(
    record: &LeaveRecord,
    role: Role,
    now: DateTime<Utc>,
) -> Option<Notification> {
    let (category, title) = match record.status {
        DecisionStatus::Approved => (NotificationCategory::LeaveApproved, "Leave request approved"),
        DecisionStatus::Rejected => (NotificationCategory::LeaveRejected, "Leave request rejected"),
        DecisionStatus::Pending | DecisionStatus::Unrecognized | DecisionStatus::Missing => {
            return None;
        }
    };

    let kind = leave_kind(record);
    let range = date_range(record.start_date.as_deref(), record.end_date.as_deref());

    Some(Notification {
        id: format!("leave_{}_{}", record.id, record.status),
        category,
        title: title.to_string(),
        message: format!("Your {} request{} was {}", kind, range, record.status),
        occurred_at: record.updated_at.or(record.created_at).unwrap_or(now),
        read: false,
        navigation_target: nav(role, "leaves"),
    })
}

/// "Annual leave", or plain "leave" when the type is unknown.
pub(crate) fn leave_kind(record: &LeaveRecord) -> String {
    match or_default(record.leave_type.as_deref(), "") {
        t if t.is_empty() => "leave".to_string(),
        t if t.to_ascii_lowercase().contains("leave") => t,
        t => format!("{} leave", t),
    }
}

#[async_trait]
impl SourceFetcher for LeaveDecisionFetcher {
    fn name(&self) -> &'static str {
        "leave_decisions"
    }

    fn applies_to(&self, role: Role) -> bool {
        matches!(role, Role::Employee | Role::Hr)
    }

    fn cap(&self) -> usize {
        LEAVE_DECISION_CAP
    }

    async fn fetch(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, SourceError> {
        let role = caller.role();
        let resolved: Vec<LeaveRecord> = self
            .backend
            .list_my_leaves(caller)
            .await?
            .into_iter()
            .filter(|r| r.status.is_resolved())
            .collect();

        Ok(most_recent(resolved, LEAVE_DECISION_CAP)
            .iter()
            .filter_map(|r| leave_decision_notification(r, role, now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeHrBackend, caller, leave};
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_pending_leave_is_not_a_decision() {
        let record = leave("9", DecisionStatus::Pending, None);
        assert!(leave_decision_notification(&record, Role::Employee, Utc::now()).is_none());
    }

    #[test]
    fn test_id_includes_status() {
        let mut record = leave("9", DecisionStatus::Approved, None);
        record.leave_type = Some("Annual".to_string());
        record.start_date = Some("2024-05-01".to_string());
        record.end_date = Some("2024-05-03".to_string());

        let n = leave_decision_notification(&record, Role::Employee, Utc::now()).unwrap();
        assert_eq!(n.id, "leave_9_approved");
        assert_eq!(n.category, NotificationCategory::LeaveApproved);
        assert_eq!(
            n.message,
            "Your Annual leave request (2024-05-01 to 2024-05-03) was approved"
        );

        record.status = DecisionStatus::Rejected;
        let n = leave_decision_notification(&record, Role::Employee, Utc::now()).unwrap();
        assert_eq!(n.id, "leave_9_rejected");
    }

    #[tokio::test]
    async fn test_caps_to_five_most_recent_resolved() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut records: Vec<LeaveRecord> = (0..8)
            .map(|i| {
                leave(
                    &i.to_string(),
                    DecisionStatus::Approved,
                    Some(base + Duration::days(i)),
                )
            })
            .collect();
        records.push(leave("p", DecisionStatus::Pending, Some(base + Duration::days(30))));

        let backend = Arc::new(FakeHrBackend::new().with_my_leaves(Ok(records)));
        let fetcher = LeaveDecisionFetcher::new(backend);
        let items = fetcher
            .fetch(&caller("emp-1", Role::Employee), Utc::now())
            .await
            .unwrap();

        let ids: Vec<&str> = items.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "leave_7_approved",
                "leave_6_approved",
                "leave_5_approved",
                "leave_4_approved",
                "leave_3_approved"
            ]
        );
    }

    #[test]
    fn test_role_gating() {
        let fetcher = LeaveDecisionFetcher::new(Arc::new(FakeHrBackend::new()));
        assert!(fetcher.applies_to(Role::Employee));
        assert!(fetcher.applies_to(Role::Hr));
        assert!(!fetcher.applies_to(Role::Admin));
    }
}
