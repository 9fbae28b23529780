use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Dashboard role of the logged-in user. Gates which sources are polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Hr,
    Admin,
}

impl Role {
    /// Path segment used to scope navigation targets (`/hr/leaves`).
    pub fn path_prefix(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Hr => "hr",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path_prefix())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "hr" => Ok(Role::Hr),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::Validation(format!(
                "Unknown role '{}'. Valid roles: employee, hr, admin",
                other
            ))),
        }
    }
}

/// A logged-in user as seen by the notification feed.
///
/// Both parts are required: a missing user id or role means "no identity",
/// which is represented as `Option<Identity>::None` everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    /// Build an identity from possibly-absent parts. Blank user ids count as absent.
    pub fn from_parts(user_id: Option<&str>, role: Option<Role>) -> Option<Self> {
        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty())?;
        Some(Self {
            user_id: user_id.to_string(),
            role: role?,
        })
    }
}

/// Whom a pass fetches for: the feed identity plus the HR backend credential
/// forwarded on that user's behalf.
///
/// Two callers with the same identity but different credentials are the same
/// feed session; only the identity decides what the feed shows.
#[derive(Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: Identity,
    credential: Option<String>,
}

impl Caller {
    /// A caller without a credential of its own.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            credential: None,
        }
    }

    /// Attach the user's HR backend token. Blank tokens are ignored.
    pub fn with_credential(mut self, token: Option<&str>) -> Self {
        self.credential = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        self
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }
}

impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller")
            .field("identity", &self.identity)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl From<Identity> for Caller {
    fn from(identity: Identity) -> Self {
        Self::new(identity)
    }
}

/// Kind of a feed item, one per source domain and outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Announcement,
    LeaveApproved,
    LeaveRejected,
    LeavePending,
    ExpenseApproved,
    ExpenseRejected,
    ExpensePending,
    AttendanceEditApproved,
    AttendanceEditRejected,
    AttendanceEditPending,
    Chat,
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationCategory::Announcement => write!(f, "announcement"),
            NotificationCategory::LeaveApproved => write!(f, "leave_approved"),
            NotificationCategory::LeaveRejected => write!(f, "leave_rejected"),
            NotificationCategory::LeavePending => write!(f, "leave_pending"),
            NotificationCategory::ExpenseApproved => write!(f, "expense_approved"),
            NotificationCategory::ExpenseRejected => write!(f, "expense_rejected"),
            NotificationCategory::ExpensePending => write!(f, "expense_pending"),
            NotificationCategory::AttendanceEditApproved => write!(f, "attendance_edit_approved"),
            NotificationCategory::AttendanceEditRejected => write!(f, "attendance_edit_rejected"),
            NotificationCategory::AttendanceEditPending => write!(f, "attendance_edit_pending"),
            NotificationCategory::Chat => write!(f, "chat"),
        }
    }
}

/// A unified feed item.
///
/// Items are recomputed on every aggregation pass and never persisted;
/// `read` is overlaid from the read-state store when the feed is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub read: bool,
    pub navigation_target: String,
}

/// What the consumer sees: the current feed, its unread count and whether a
/// user-visible pass (identity change or manual refresh) is in flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
    pub loading: bool,
}

impl FeedSnapshot {
    pub fn new(notifications: Vec<Notification>) -> Self {
        let mut snapshot = Self {
            notifications,
            unread_count: 0,
            loading: false,
        };
        snapshot.recount();
        snapshot
    }

    /// Recompute `unread_count` from the items.
    pub fn recount(&mut self) {
        self.unread_count = self.notifications.iter().filter(|n| !n.read).count();
    }
}
