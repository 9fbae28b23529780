use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrdesk_common::types::{Caller, Notification, NotificationCategory, Role};

use crate::SourceFetcher;
use crate::backend::HrBackend;
use crate::dto::{AttendanceEditRecord, DecisionStatus, most_recent};
use crate::error::SourceError;
use crate::format::{nav, short_date};

/// Resolved attendance corrections contributed per pass.
pub const ATTENDANCE_EDIT_DECISION_CAP: usize = 5;

/// Approvals and rejections of the user's attendance edit requests.
pub struct AttendanceEditDecisionFetcher {
    backend: Arc<dyn HrBackend>,
}

impl AttendanceEditDecisionFetcher {
    pub fn new(backend: Arc<dyn HrBackend>) -> Self {
        Self { backend }
    }
}

/// ` for 2024-03-01` when the corrected day is known.
pub(crate) fn for_day(record: &AttendanceEditRecord) -> String {
    record
        .date
        .as_deref()
        .map(short_date)
        .filter(|d| !d.is_empty())
        .map(|d| format!(" for {}", d))
        .unwrap_or_default()
}

pub fn attendance_edit_decision_notification(
    record: &AttendanceEditRecord,
    role: Role,
    now: DateTime<Utc>,
) -> Option<Notification> {
    let (category, title) = match record.status {
        DecisionStatus::Approved => (
            NotificationCategory::AttendanceEditApproved,
            "Attendance correction approved",
        ),
        DecisionStatus::Rejected => (
            NotificationCategory::AttendanceEditRejected,
            "Attendance correction rejected",
        ),
        DecisionStatus::Pending | DecisionStatus::Unrecognized | DecisionStatus::Missing => {
            return None;
        }
    };

    Some(Notification {
        id: format!("attedit_{}_{}", record.id, record.status),
        category,
        title: title.to_string(),
        message: format!(
            "Your attendance edit request{} was {}",
            for_day(record),
            record.status
        ),
        occurred_at: record.updated_at.or(record.created_at).unwrap_or(now),
        read: false,
        navigation_target: nav(role, "attendance"),
    })
}

#[async_trait]
impl SourceFetcher for AttendanceEditDecisionFetcher {
    fn name(&self) -> &'static str {
        "attendance_edit_decisions"
    }

    fn applies_to(&self, role: Role) -> bool {
        matches!(role, Role::Employee | Role::Hr)
    }

    fn cap(&self) -> usize {
        ATTENDANCE_EDIT_DECISION_CAP
    }

    async fn fetch(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, SourceError> {
        let role = caller.role();
        let resolved: Vec<AttendanceEditRecord> = self
            .backend
            .list_my_attendance_edits(caller)
            .await?
            .into_iter()
            .filter(|r| r.status.is_resolved())
            .collect();

        Ok(most_recent(resolved, ATTENDANCE_EDIT_DECISION_CAP)
            .iter()
            .filter_map(|r| attendance_edit_decision_notification(r, role, now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::attendance_edit;
    use chrono::TimeZone;

    #[test]
    fn test_attendance_edit_mapping() {
        let at = Utc.with_ymd_and_hms(2024, 2, 10, 8, 0, 0).unwrap();
        let mut record = attendance_edit("31", DecisionStatus::Approved, Some(at));
        record.date = Some("2024-02-09T00:00:00Z".to_string());

        let n = attendance_edit_decision_notification(&record, Role::Employee, Utc::now()).unwrap();
        assert_eq!(n.id, "attedit_31_approved");
        assert_eq!(n.category, NotificationCategory::AttendanceEditApproved);
        assert_eq!(
            n.message,
            "Your attendance edit request for 2024-02-09 was approved"
        );
        assert_eq!(n.occurred_at, at);
        assert_eq!(n.navigation_target, "/employee/attendance");
    }

    #[test]
    fn test_created_at_used_when_not_updated() {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut record = attendance_edit("32", DecisionStatus::Rejected, None);
        record.created_at = Some(at);

        let n = attendance_edit_decision_notification(&record, Role::Hr, Utc::now()).unwrap();
        assert_eq!(n.occurred_at, at);
        assert_eq!(n.message, "Your attendance edit request was rejected");
    }
}
