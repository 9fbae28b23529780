//! Typed records returned by the HR backend collaborator APIs.
//!
//! The backend is loosely typed: ids arrive as strings or numbers, lists may
//! or may not be wrapped in a `{"data": [...]}` envelope, and timestamps are
//! sometimes missing or zone-less. Every record here decodes all of those
//! shapes. Optional fields that cannot be interpreted fall back to `None`
//! (or zero for counters), and a record that cannot be decoded at all is
//! skipped without failing the rest of its list.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Record identifier normalized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecordId(pub String);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Uint(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RecordId(s),
            Raw::Int(n) => RecordId(n.to_string()),
            Raw::Uint(n) => RecordId(n.to_string()),
        })
    }
}

/// Approval state of a leave, expense or attendance-edit request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Pending,
    Approved,
    Rejected,
    /// A status the feed does not know (cancelled, draft, ...).
    Unrecognized,
    /// No status on the record, or an empty one.
    #[default]
    Missing,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Pending => "pending",
            DecisionStatus::Approved => "approved",
            DecisionStatus::Rejected => "rejected",
            DecisionStatus::Unrecognized => "unrecognized",
            DecisionStatus::Missing => "missing",
        }
    }

    /// Still waiting on a decision. Approval queues may omit the status of
    /// their records, so a missing status counts as open.
    pub fn is_open(&self) -> bool {
        matches!(self, DecisionStatus::Pending | DecisionStatus::Missing)
    }

    /// Approved or rejected.
    pub fn is_resolved(&self) -> bool {
        matches!(self, DecisionStatus::Approved | DecisionStatus::Rejected)
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for DecisionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => return Ok(DecisionStatus::Missing),
            Some(Value::String(s)) => s,
            Some(_) => return Ok(DecisionStatus::Unrecognized),
        };
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "" => DecisionStatus::Missing,
            "pending" => DecisionStatus::Pending,
            "approved" => DecisionStatus::Approved,
            "rejected" => DecisionStatus::Rejected,
            _ => DecisionStatus::Unrecognized,
        })
    }
}

/// A list response, either a bare array or wrapped in `{"data": [...]}`.
///
/// Items stay raw until [`ListEnvelope::into_records`], so one record of the
/// wrong shape cannot reject the whole list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope {
    Bare(Vec<Value>),
    Wrapped { data: Vec<Value> },
}

impl ListEnvelope {
    pub fn into_raw(self) -> Vec<Value> {
        match self {
            ListEnvelope::Bare(items) => items,
            ListEnvelope::Wrapped { data } => data,
        }
    }

    /// Decode every item as `T`, skipping the ones that do not decode.
    pub fn into_records<T: DeserializeOwned>(self, endpoint: &str) -> Vec<T> {
        self.into_raw()
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(endpoint, index, error = %e, "Skipping undecodable record");
                    None
                }
            })
            .collect()
    }
}

/// Response of the lightweight chat unread-count endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnreadCountResponse {
    #[serde(
        default,
        alias = "unreadCount",
        alias = "unread_count",
        alias = "total",
        deserialize_with = "lenient_count"
    )]
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementRecord {
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(
        default,
        alias = "description",
        alias = "body",
        deserialize_with = "lenient_text"
    )]
    pub content: Option<String>,
    #[serde(default, alias = "created_at", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomRecord {
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, alias = "unread_count", deserialize_with = "lenient_count")]
    pub unread_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRecord {
    pub id: RecordId,
    #[serde(default)]
    pub status: DecisionStatus,
    #[serde(
        default,
        alias = "leave_type",
        alias = "type",
        deserialize_with = "lenient_text"
    )]
    pub leave_type: Option<String>,
    #[serde(default, alias = "start_date", deserialize_with = "lenient_text")]
    pub start_date: Option<String>,
    #[serde(default, alias = "end_date", deserialize_with = "lenient_text")]
    pub end_date: Option<String>,
    #[serde(default, alias = "employee_name", deserialize_with = "lenient_text")]
    pub employee_name: Option<String>,
    #[serde(default, alias = "created_at", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: RecordId,
    #[serde(default)]
    pub status: DecisionStatus,
    #[serde(default, alias = "description", deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    #[serde(default, alias = "created_at", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEditRecord {
    pub id: RecordId,
    #[serde(default)]
    pub status: DecisionStatus,
    #[serde(default, alias = "attendance_date", deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: Option<String>,
    #[serde(default, alias = "employee_name", deserialize_with = "lenient_text")]
    pub employee_name: Option<String>,
    #[serde(default, alias = "created_at", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Records that carry their own activity timestamp, used to pick the
/// "most recent N" of a source in that source's native ordering.
pub trait Timestamped {
    fn activity_at(&self) -> Option<DateTime<Utc>>;
}

impl Timestamped for AnnouncementRecord {
    fn activity_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Timestamped for LeaveRecord {
    fn activity_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

impl Timestamped for ExpenseRecord {
    fn activity_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

impl Timestamped for AttendanceEditRecord {
    fn activity_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// Keep the `cap` most recent records, newest first. Records without a
/// timestamp sort after every dated record and keep their relative order.
pub fn most_recent<T: Timestamped>(mut records: Vec<T>, cap: usize) -> Vec<T> {
    records.sort_by(|a, b| match (a.activity_at(), b.activity_at()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    records.truncate(cap);
    records
}

/// Accepts RFC 3339, zone-less date-times (read as UTC) and plain dates.
/// Anything else, including `null`, becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        Value::String(s) => parse_timestamp(&s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| DateTime::<Utc>::from_timestamp_millis(millis)),
        _ => None,
    }))
}

/// Strings as-is, numbers and booleans in their JSON text form, anything
/// else as `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Numbers and numeric strings; anything else, including non-finite
/// values, is `None`.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(amount.filter(|a| a.is_finite()))
}

/// Non-negative integers, also as strings. Anything else reads as zero.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_id_accepts_numbers_and_strings() {
        let a: AnnouncementRecord = serde_json::from_value(serde_json::json!({"id": 42})).unwrap();
        let b: AnnouncementRecord =
            serde_json::from_value(serde_json::json!({"id": "a-7"})).unwrap();
        assert_eq!(a.id.0, "42");
        assert_eq!(b.id.0, "a-7");
    }

    #[test]
    fn test_status_is_case_insensitive_with_fallback() {
        let leave: LeaveRecord =
            serde_json::from_value(serde_json::json!({"id": 1, "status": "APPROVED"})).unwrap();
        assert_eq!(leave.status, DecisionStatus::Approved);

        let leave: LeaveRecord =
            serde_json::from_value(serde_json::json!({"id": 1, "status": "cancelled"})).unwrap();
        assert_eq!(leave.status, DecisionStatus::Unrecognized);
        assert!(!leave.status.is_open());

        let leave: LeaveRecord =
            serde_json::from_value(serde_json::json!({"id": 1, "status": null})).unwrap();
        assert_eq!(leave.status, DecisionStatus::Missing);

        let leave: LeaveRecord = serde_json::from_value(serde_json::json!({"id": 1})).unwrap();
        assert_eq!(leave.status, DecisionStatus::Missing);
        assert!(leave.status.is_open());
    }

    fn records<T: DeserializeOwned>(raw: Value) -> Vec<T> {
        serde_json::from_value::<ListEnvelope>(raw)
            .unwrap()
            .into_records("test")
    }

    #[test]
    fn test_envelope_accepts_both_shapes() {
        let bare: Vec<ChatRoomRecord> = records(serde_json::json!([{"id": 1, "unreadCount": 2}]));
        let rooms: Vec<ChatRoomRecord> = records(serde_json::json!(
            {"data": [{"id": 1, "unread_count": 3}, {"id": 2}]}
        ));
        assert_eq!(bare[0].unread_count, 2);
        assert_eq!(rooms[0].unread_count, 3);
        assert_eq!(rooms[1].unread_count, 0);
    }

    #[test]
    fn test_wrongly_typed_fields_fall_back() {
        let expenses: Vec<ExpenseRecord> = records(serde_json::json!([
            {"id": 1, "amount": 10.0},
            {"id": 2, "amount": "12.50", "title": 7, "category": null},
            {"id": 3, "amount": {"value": 3}, "title": ["x"]},
        ]));
        assert_eq!(expenses.len(), 3);
        assert_eq!(expenses[0].amount, Some(10.0));
        assert_eq!(expenses[1].amount, Some(12.5));
        assert_eq!(expenses[1].title.as_deref(), Some("7"));
        assert_eq!(expenses[1].category, None);
        assert_eq!(expenses[2].amount, None);
        assert_eq!(expenses[2].title, None);

        let rooms: Vec<ChatRoomRecord> = records(serde_json::json!([
            {"id": "r1", "unreadCount": null},
            {"id": "r2", "unreadCount": "4"},
            {"id": "r3", "unreadCount": -2},
        ]));
        let counts: Vec<u64> = rooms.iter().map(|r| r.unread_count).collect();
        assert_eq!(counts, vec![0, 4, 0]);

        let count: UnreadCountResponse =
            serde_json::from_value(serde_json::json!({"count": "6"})).unwrap();
        assert_eq!(count.count, 6);
    }

    #[test]
    fn test_undecodable_records_are_skipped() {
        let leaves: Vec<LeaveRecord> = records(serde_json::json!({"data": [
            {"id": 1, "status": "approved"},
            {"status": "approved"},
            "not an object",
            {"id": {"nested": true}},
            {"id": "4", "status": "rejected"},
        ]}));
        let ids: Vec<&str> = leaves.iter().map(|l| l.id.0.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_lenient_timestamps() {
        let rec: LeaveRecord = serde_json::from_value(serde_json::json!({
            "id": 1,
            "createdAt": "2024-03-01T09:30:00",
            "updated_at": "not a date"
        }))
        .unwrap();
        assert_eq!(
            rec.created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
        );
        assert_eq!(rec.updated_at, None);

        assert_eq!(
            parse_timestamp("2024-03-01T09:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_most_recent_orders_and_caps() {
        let make = |id: &str, day: Option<u32>| AnnouncementRecord {
            id: RecordId::from(id),
            title: None,
            content: None,
            created_at: day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()),
        };
        let records = vec![
            make("undated", None),
            make("old", Some(1)),
            make("new", Some(9)),
            make("mid", Some(5)),
        ];
        let ids: Vec<String> = most_recent(records, 3)
            .into_iter()
            .map(|r| r.id.0)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
