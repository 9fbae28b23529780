//! Approval inboxes for HR and admins: leave requests and attendance edit
//! requests still waiting on a decision.
//!
//! The two queues are separate fetchers so that one inbox being down does
//! not hide the other.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrdesk_common::types::{Caller, Notification, NotificationCategory, Role};

use crate::SourceFetcher;
use crate::attendance::for_day;
use crate::backend::HrBackend;
use crate::dto::{AttendanceEditRecord, LeaveRecord, most_recent};
use crate::error::SourceError;
use crate::format::{date_range, nav, or_default};
use crate::leave::leave_kind;

/// Pending items contributed per queue per pass.
pub const PENDING_APPROVAL_CAP: usize = 3;

fn is_approver(role: Role) -> bool {
    matches!(role, Role::Hr | Role::Admin)
}

pub struct PendingLeaveFetcher {
    backend: Arc<dyn HrBackend>,
}

impl PendingLeaveFetcher {
    pub fn new(backend: Arc<dyn HrBackend>) -> Self {
        Self { backend }
    }
}

pub fn pending_leave_notification(
    record: &LeaveRecord,
    role: Role,
    now: DateTime<Utc>,
) -> Notification {
    let who = or_default(record.employee_name.as_deref(), "An employee");
    let range = date_range(record.start_date.as_deref(), record.end_date.as_deref());

    Notification {
        id: format!("pending_leave_{}", record.id),
        category: NotificationCategory::LeavePending,
        title: "Leave request awaiting approval".to_string(),
        message: format!("{} requested {}{}", who, leave_kind(record), range),
        occurred_at: record.created_at.or(record.updated_at).unwrap_or(now),
        read: false,
        navigation_target: nav(role, "approvals/leaves"),
    }
}

#[async_trait]
impl SourceFetcher for PendingLeaveFetcher {
    fn name(&self) -> &'static str {
        "pending_approvals.leaves"
    }

    fn applies_to(&self, role: Role) -> bool {
        is_approver(role)
    }

    fn cap(&self) -> usize {
        PENDING_APPROVAL_CAP
    }

    async fn fetch(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, SourceError> {
        let role = caller.role();
        let pending: Vec<LeaveRecord> = self
            .backend
            .list_pending_leaves(caller)
            .await?
            .into_iter()
            .filter(|r| r.status.is_open())
            .collect();

        Ok(most_recent(pending, PENDING_APPROVAL_CAP)
            .iter()
            .map(|r| pending_leave_notification(r, role, now))
            .collect())
    }
}

pub struct PendingAttendanceEditFetcher {
    backend: Arc<dyn HrBackend>,
}

impl PendingAttendanceEditFetcher {
    pub fn new(backend: Arc<dyn HrBackend>) -> Self {
        Self { backend }
    }
}

pub fn pending_attendance_edit_notification(
    record: &AttendanceEditRecord,
    role: Role,
    now: DateTime<Utc>,
) -> Notification {
    let who = or_default(record.employee_name.as_deref(), "An employee");

    Notification {
        id: format!("pending_edit_{}", record.id),
        category: NotificationCategory::AttendanceEditPending,
        title: "Attendance edit awaiting approval".to_string(),
        message: format!("{} requested an attendance correction{}", who, for_day(record)),
        occurred_at: record.created_at.or(record.updated_at).unwrap_or(now),
        read: false,
        navigation_target: nav(role, "approvals/attendance-edits"),
    }
}

#[async_trait]
impl SourceFetcher for PendingAttendanceEditFetcher {
    fn name(&self) -> &'static str {
        "pending_approvals.attendance_edits"
    }

    fn applies_to(&self, role: Role) -> bool {
        is_approver(role)
    }

    fn cap(&self) -> usize {
        PENDING_APPROVAL_CAP
    }

    async fn fetch(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, SourceError> {
        let role = caller.role();
        let pending: Vec<AttendanceEditRecord> = self
            .backend
            .list_pending_attendance_edits(caller)
            .await?
            .into_iter()
            .filter(|r| r.status.is_open())
            .collect();

        Ok(most_recent(pending, PENDING_APPROVAL_CAP)
            .iter()
            .map(|r| pending_attendance_edit_notification(r, role, now))
            .collect())
    }
}
