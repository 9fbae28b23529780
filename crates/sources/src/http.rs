//! reqwest-backed implementation of [`HrBackend`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use hrdesk_common::config::AppConfig;
use hrdesk_common::types::Caller;

use crate::backend::HrBackend;
use crate::dto::{
    AnnouncementRecord, AttendanceEditRecord, ChatRoomRecord, ExpenseRecord, LeaveRecord,
    ListEnvelope, UnreadCountResponse,
};
use crate::error::SourceError;

/// Collaborator endpoint paths, relative to the backend base URL.
pub mod paths {
    pub const ANNOUNCEMENTS: &str = "announcements";
    pub const CHAT_UNREAD_COUNT: &str = "chat/unread-count";
    pub const CHAT_ROOMS: &str = "chat/rooms";
    pub const MY_LEAVES: &str = "leaves/me";
    pub const MY_EXPENSES: &str = "expenses/me";
    pub const MY_ATTENDANCE_EDITS: &str = "attendance/edit-requests/me";
    pub const PENDING_LEAVES: &str = "leaves/pending";
    pub const PENDING_ATTENDANCE_EDITS: &str = "attendance/edit-requests/pending";
}

/// HTTP client for the HR REST backend.
///
/// Requests carry the caller's own credential. The optional fallback token
/// is only for single-user deployments where the configured token belongs
/// to the user being polled; a multi-user server builds the backend with
/// [`HttpHrBackend::per_caller`] so a caller without a credential is sent
/// unauthenticated rather than as someone else.
///
/// Every request carries the client-wide timeout, so a slow collaborator
/// delays only its own source's contribution to a pass.
#[derive(Debug, Clone)]
pub struct HttpHrBackend {
    client: reqwest::Client,
    base_url: String,
    fallback_token: Option<String>,
}

impl HttpHrBackend {
    pub fn new(
        base_url: impl Into<String>,
        fallback_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fallback_token,
        })
    }

    /// Single-user client: `HR_API_TOKEN` stands in for callers that carry
    /// no credential.
    pub fn from_config(config: &AppConfig) -> Result<Self, SourceError> {
        Self::new(
            config.hr_api_base_url.clone(),
            config.hr_api_token.clone(),
            Duration::from_millis(config.hr_api_timeout_ms),
        )
    }

    /// Multi-user client: only ever forwards the caller's own credential.
    pub fn per_caller(config: &AppConfig) -> Result<Self, SourceError> {
        Self::new(
            config.hr_api_base_url.clone(),
            None,
            Duration::from_millis(config.hr_api_timeout_ms),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn credential<'a>(&'a self, caller: &'a Caller) -> Option<&'a str> {
        caller.credential().or(self.fallback_token.as_deref())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        caller: &Caller,
        path: &str,
    ) -> Result<T, SourceError> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = self.credential(caller) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode {
            endpoint: path.to_string(),
            detail: e.to_string(),
        })
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        caller: &Caller,
        path: &str,
    ) -> Result<Vec<T>, SourceError> {
        let envelope: ListEnvelope = self.get_json(caller, path).await?;
        Ok(envelope.into_records(path))
    }
}

/// The unread-count endpoint answers with either a bare number or an object.
/// `Wrapped` must be tried before `Object`: every field of the object is
/// optional, so it would match an envelope and read zero.
#[derive(Deserialize)]
#[serde(untagged)]
enum UnreadCountBody {
    Bare(u64),
    Wrapped { data: UnreadCountResponse },
    Object(UnreadCountResponse),
}

#[async_trait]
impl HrBackend for HttpHrBackend {
    async fn list_announcements(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AnnouncementRecord>, SourceError> {
        self.get_list(caller, paths::ANNOUNCEMENTS).await
    }

    async fn chat_unread_count(&self, caller: &Caller) -> Result<u64, SourceError> {
        let body: UnreadCountBody = self.get_json(caller, paths::CHAT_UNREAD_COUNT).await?;
        Ok(match body {
            UnreadCountBody::Bare(count) => count,
            UnreadCountBody::Object(resp) | UnreadCountBody::Wrapped { data: resp } => resp.count,
        })
    }

    async fn list_chat_rooms(&self, caller: &Caller) -> Result<Vec<ChatRoomRecord>, SourceError> {
        self.get_list(caller, paths::CHAT_ROOMS).await
    }

    async fn list_my_leaves(&self, caller: &Caller) -> Result<Vec<LeaveRecord>, SourceError> {
        self.get_list(caller, paths::MY_LEAVES).await
    }

    async fn list_my_expenses(&self, caller: &Caller) -> Result<Vec<ExpenseRecord>, SourceError> {
        self.get_list(caller, paths::MY_EXPENSES).await
    }

    async fn list_my_attendance_edits(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AttendanceEditRecord>, SourceError> {
        self.get_list(caller, paths::MY_ATTENDANCE_EDITS).await
    }

    async fn list_pending_leaves(&self, caller: &Caller) -> Result<Vec<LeaveRecord>, SourceError> {
        self.get_list(caller, paths::PENDING_LEAVES).await
    }

    async fn list_pending_attendance_edits(
        &self,
        caller: &Caller,
    ) -> Result<Vec<AttendanceEditRecord>, SourceError> {
        self.get_list(caller, paths::PENDING_ATTENDANCE_EDITS).await
    }
}

#[cfg(test)]
mod tests {
    use hrdesk_common::types::{Identity, Role};

    use super::*;

    #[test]
    fn test_url_joining_trims_slashes() {
        let backend =
            HttpHrBackend::new("http://hr.local/api/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(backend.url("/leaves/me"), "http://hr.local/api/leaves/me");
        assert_eq!(
            backend.url(paths::CHAT_ROOMS),
            "http://hr.local/api/chat/rooms"
        );
    }

    #[test]
    fn test_caller_credential_wins_over_fallback() {
        let identity = Identity::from_parts(Some("emp-1"), Some(Role::Employee)).unwrap();
        let anonymous = Caller::new(identity.clone());
        let signed_in = Caller::new(identity).with_credential(Some("user-token"));

        let single_user = HttpHrBackend::new(
            "http://hr.local",
            Some("service-token".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(single_user.credential(&signed_in), Some("user-token"));
        assert_eq!(single_user.credential(&anonymous), Some("service-token"));

        let multi_user =
            HttpHrBackend::new("http://hr.local", None, Duration::from_secs(1)).unwrap();
        assert_eq!(multi_user.credential(&anonymous), None);
    }

    #[test]
    fn test_unread_count_body_shapes() {
        let count = |raw: &str| match serde_json::from_str::<UnreadCountBody>(raw).unwrap() {
            UnreadCountBody::Bare(n) => n,
            UnreadCountBody::Object(r) | UnreadCountBody::Wrapped { data: r } => r.count,
        };
        assert_eq!(count("7"), 7);
        assert_eq!(count(r#"{"count": 3}"#), 3);
        assert_eq!(count(r#"{"unreadCount": 4}"#), 4);
        assert_eq!(count(r#"{"data": {"unread_count": 5}}"#), 5);
    }
}
