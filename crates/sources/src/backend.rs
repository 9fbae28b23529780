use async_trait::async_trait;

use hrdesk_common::types::Caller;

use crate::dto::{
    AnnouncementRecord, AttendanceEditRecord, ChatRoomRecord, ExpenseRecord, LeaveRecord,
};
use crate::error::SourceError;

/// The HR backend collaborator APIs the feed reads from.
///
/// Every call is made on behalf of one `caller`. "My" endpoints are scoped
/// to that user by the backend's own auth, so implementations must never
/// answer them with another user's credential. The pending queues are the
/// approval inboxes visible to HR and admins.
#[async_trait]
pub trait HrBackend: Send + Sync {
    async fn list_announcements(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AnnouncementRecord>, SourceError>;

    /// Total unread chat messages across all rooms.
    async fn chat_unread_count(&self, caller: &Caller) -> Result<u64, SourceError>;

    async fn list_chat_rooms(&self, caller: &Caller) -> Result<Vec<ChatRoomRecord>, SourceError>;

    async fn list_my_leaves(&self, caller: &Caller) -> Result<Vec<LeaveRecord>, SourceError>;

    async fn list_my_expenses(&self, caller: &Caller) -> Result<Vec<ExpenseRecord>, SourceError>;

    async fn list_my_attendance_edits(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AttendanceEditRecord>, SourceError>;

    async fn list_pending_leaves(&self, caller: &Caller) -> Result<Vec<LeaveRecord>, SourceError>;

    async fn list_pending_attendance_edits(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AttendanceEditRecord>, SourceError>;
}
