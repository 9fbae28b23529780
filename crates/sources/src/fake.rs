//! In-memory [`HrBackend`] with canned responses and call counters.
//!
//! Used by tests across the workspace and for running the feed without a
//! live HR backend. Every endpoint defaults to an empty success. Responses
//! can be overridden per user id, and the credential of every call is
//! recorded.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrdesk_common::types::{Caller, Identity, Role};

use crate::backend::HrBackend;
use crate::dto::{
    AnnouncementRecord, AttendanceEditRecord, ChatRoomRecord, DecisionStatus, ExpenseRecord,
    LeaveRecord, RecordId,
};
use crate::error::SourceError;

/// Canned result for one endpoint. `Err` carries the failure message.
pub type Canned<T> = Result<T, String>;

struct Responses {
    announcements: Canned<Vec<AnnouncementRecord>>,
    chat_unread: Canned<u64>,
    chat_rooms: Canned<Vec<ChatRoomRecord>>,
    my_leaves: Canned<Vec<LeaveRecord>>,
    my_expenses: Canned<Vec<ExpenseRecord>>,
    my_attendance_edits: Canned<Vec<AttendanceEditRecord>>,
    pending_leaves: Canned<Vec<LeaveRecord>>,
    pending_attendance_edits: Canned<Vec<AttendanceEditRecord>>,
}

impl Default for Responses {
    fn default() -> Self {
        Self {
            announcements: Ok(Vec::new()),
            chat_unread: Ok(0),
            chat_rooms: Ok(Vec::new()),
            my_leaves: Ok(Vec::new()),
            my_expenses: Ok(Vec::new()),
            my_attendance_edits: Ok(Vec::new()),
            pending_leaves: Ok(Vec::new()),
            pending_attendance_edits: Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
pub struct FakeHrBackend {
    responses: Mutex<Responses>,
    /// Responses for specific user ids, consulted before `responses`.
    users: HashMap<String, FakeHrBackend>,
    calls: Mutex<HashMap<&'static str, usize>>,
    credentials: Mutex<Vec<Option<String>>>,
    latency: Option<Duration>,
}

macro_rules! canned_setters {
    ($($with:ident, $set:ident, $field:ident: $ty:ty;)*) => {
        $(
            pub fn $with(self, result: Canned<$ty>) -> Self {
                self.$set(result);
                self
            }

            pub fn $set(&self, result: Canned<$ty>) {
                if let Ok(mut responses) = self.responses.lock() {
                    responses.$field = result;
                }
            }
        )*
    };
}

impl FakeHrBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` (simulates a slow collaborator).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer calls made for `user_id` from `responses` instead. Only the
    /// override's canned results are used; calls are counted here.
    pub fn with_user(mut self, user_id: &str, responses: FakeHrBackend) -> Self {
        self.users.insert(user_id.to_string(), responses);
        self
    }

    canned_setters! {
        with_announcements, set_announcements, announcements: Vec<AnnouncementRecord>;
        with_chat_unread, set_chat_unread, chat_unread: u64;
        with_chat_rooms, set_chat_rooms, chat_rooms: Vec<ChatRoomRecord>;
        with_my_leaves, set_my_leaves, my_leaves: Vec<LeaveRecord>;
        with_my_expenses, set_my_expenses, my_expenses: Vec<ExpenseRecord>;
        with_my_attendance_edits, set_my_attendance_edits, my_attendance_edits: Vec<AttendanceEditRecord>;
        with_pending_leaves, set_pending_leaves, pending_leaves: Vec<LeaveRecord>;
        with_pending_attendance_edits, set_pending_attendance_edits, pending_attendance_edits: Vec<AttendanceEditRecord>;
    }

    /// Number of calls made to `endpoint` (the field names above, e.g. `"chat_rooms"`).
    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(endpoint).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total calls across all endpoints.
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    /// Credentials of every call so far, in call order.
    pub fn credentials(&self) -> Vec<Option<String>> {
        self.credentials
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    async fn respond<T: Clone>(
        &self,
        caller: &Caller,
        endpoint: &'static str,
        pick: impl Fn(&Responses) -> &Canned<T>,
    ) -> Result<T, SourceError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(endpoint).or_insert(0) += 1;
        }
        if let Ok(mut seen) = self.credentials.lock() {
            seen.push(caller.credential().map(String::from));
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let source = self.users.get(caller.user_id()).unwrap_or(self);
        let result = match source.responses.lock() {
            Ok(responses) => pick(&responses).clone(),
            Err(_) => Err("fake backend poisoned".to_string()),
        };
        result.map_err(SourceError::Unavailable)
    }
}

#[async_trait]
impl HrBackend for FakeHrBackend {
    async fn list_announcements(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AnnouncementRecord>, SourceError> {
        self.respond(caller, "announcements", |r| &r.announcements).await
    }

    async fn chat_unread_count(&self, caller: &Caller) -> Result<u64, SourceError> {
        self.respond(caller, "chat_unread", |r| &r.chat_unread).await
    }

    async fn list_chat_rooms(&self, caller: &Caller) -> Result<Vec<ChatRoomRecord>, SourceError> {
        self.respond(caller, "chat_rooms", |r| &r.chat_rooms).await
    }

    async fn list_my_leaves(&self, caller: &Caller) -> Result<Vec<LeaveRecord>, SourceError> {
        self.respond(caller, "my_leaves", |r| &r.my_leaves).await
    }

    async fn list_my_expenses(&self, caller: &Caller) -> Result<Vec<ExpenseRecord>, SourceError> {
        self.respond(caller, "my_expenses", |r| &r.my_expenses).await
    }

    async fn list_my_attendance_edits(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AttendanceEditRecord>, SourceError> {
        self.respond(caller, "my_attendance_edits", |r| &r.my_attendance_edits)
            .await
    }

    async fn list_pending_leaves(&self, caller: &Caller) -> Result<Vec<LeaveRecord>, SourceError> {
        self.respond(caller, "pending_leaves", |r| &r.pending_leaves).await
    }

    async fn list_pending_attendance_edits(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AttendanceEditRecord>, SourceError> {
        self.respond(caller, "pending_attendance_edits", |r| &r.pending_attendance_edits)
            .await
    }
}

// Record builders with every optional field left empty.

/// A caller for `user_id` without a credential.
pub fn caller(user_id: &str, role: Role) -> Caller {
    Caller::new(Identity {
        user_id: user_id.to_string(),
        role,
    })
}

pub fn announcement(id: &str, created_at: Option<DateTime<Utc>>) -> AnnouncementRecord {
    AnnouncementRecord {
        id: RecordId::from(id),
        title: Some(format!("Announcement {}", id)),
        content: Some("Details inside".to_string()),
        created_at,
    }
}

pub fn room(id: &str, unread_count: u64) -> ChatRoomRecord {
    ChatRoomRecord {
        id: RecordId::from(id),
        name: None,
        unread_count,
    }
}

pub fn leave(id: &str, status: DecisionStatus, updated_at: Option<DateTime<Utc>>) -> LeaveRecord {
    LeaveRecord {
        id: RecordId::from(id),
        status,
        leave_type: None,
        start_date: None,
        end_date: None,
        employee_name: None,
        created_at: None,
        updated_at,
    }
}

pub fn expense(
    id: &str,
    status: DecisionStatus,
    updated_at: Option<DateTime<Utc>>,
) -> ExpenseRecord {
    ExpenseRecord {
        id: RecordId::from(id),
        status,
        title: None,
        category: None,
        amount: None,
        created_at: None,
        updated_at,
    }
}

pub fn attendance_edit(
    id: &str,
    status: DecisionStatus,
    updated_at: Option<DateTime<Utc>>,
) -> AttendanceEditRecord {
    AttendanceEditRecord {
        id: RecordId::from(id),
        status,
        date: None,
        reason: None,
        employee_name: None,
        created_at: None,
        updated_at,
    }
}
