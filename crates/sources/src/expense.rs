use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrdesk_common::types::{Caller, Notification, NotificationCategory, Role};

use crate::SourceFetcher;
use crate::backend::HrBackend;
use crate::dto::{DecisionStatus, ExpenseRecord, most_recent};
use crate::error::SourceError;
use crate::format::{nav, or_default};

/// Resolved expense claims contributed per pass.
pub const EXPENSE_DECISION_CAP: usize = 5;

/// Approvals and rejections of the user's own expense claims.
pub struct ExpenseDecisionFetcher {
    backend: Arc<dyn HrBackend>,
}

impl ExpenseDecisionFetcher {
    pub fn new(backend: Arc<dyn HrBackend>) -> Self {
        Self { backend }
    }
}

/// Map a resolved expense claim. Pending and unknown statuses yield `None`.
///
/// The claim is named by its title, then its category, then "expense claim";
/// the amount is appended when known.
pub fn expense_decision_notification(
    record: &ExpenseRecord,
    role: Role,
    now: DateTime<Utc>,
) -> Option<Notification> {
    let (category, title) = match record.status {
        DecisionStatus::Approved => (NotificationCategory::ExpenseApproved, "Expense approved"),
        DecisionStatus::Rejected => (NotificationCategory::ExpenseRejected, "Expense rejected"),
        DecisionStatus::Pending | DecisionStatus::Unrecognized | DecisionStatus::Missing => {
            return None;
        }
    };

    fn non_blank(field: &Option<String>) -> Option<&str> {
        field.as_deref().filter(|s| !s.trim().is_empty())
    }
    let label = or_default(
        non_blank(&record.title).or(non_blank(&record.category)),
        "expense claim",
    );
    let amount = record
        .amount
        .filter(|a| a.is_finite())
        .map(|a| format!(" of {:.2}", a))
        .unwrap_or_default();

    Some(Notification {
        id: format!("exp_{}_{}", record.id, record.status),
        category,
        title: title.to_string(),
        message: format!("Your {}{} was {}", label, amount, record.status),
        occurred_at: record.updated_at.or(record.created_at).unwrap_or(now),
        read: false,
        navigation_target: nav(role, "expenses"),
    })
}

#[async_trait]
impl SourceFetcher for ExpenseDecisionFetcher {
    fn name(&self) -> &'static str {
        "expense_decisions"
    }

    fn applies_to(&self, role: Role) -> bool {
        matches!(role, Role::Employee | Role::Hr)
    }

    fn cap(&self) -> usize {
        EXPENSE_DECISION_CAP
    }

    async fn fetch(
        &self,
        caller: &Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, SourceError> {
        let role = caller.role();
        let resolved: Vec<ExpenseRecord> = self
            .backend
            .list_my_expenses(caller)
            .await?
            .into_iter()
            .filter(|r| r.status.is_resolved())
            .collect();

        Ok(most_recent(resolved, EXPENSE_DECISION_CAP)
            .iter()
            .filter_map(|r| expense_decision_notification(r, role, now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::expense;

    #[test]
    fn test_expense_message_uses_title_and_amount() {
        let mut record = expense("e1", DecisionStatus::Rejected, None);
        record.title = Some("Taxi to client".to_string());
        record.amount = Some(42.5);

        let n = expense_decision_notification(&record, Role::Hr, Utc::now()).unwrap();
        assert_eq!(n.id, "exp_e1_rejected");
        assert_eq!(n.category, NotificationCategory::ExpenseRejected);
        assert_eq!(n.message, "Your Taxi to client of 42.50 was rejected");
        assert_eq!(n.navigation_target, "/hr/expenses");
    }

    #[test]
    fn test_expense_defaults() {
        let record = expense("e2", DecisionStatus::Approved, None);
        let n = expense_decision_notification(&record, Role::Employee, Utc::now()).unwrap();
        assert_eq!(n.message, "Your expense claim was approved");
    }

    #[test]
    fn test_blank_title_falls_back_to_category() {
        let mut record = expense("e4", DecisionStatus::Approved, None);
        record.title = Some("   ".to_string());
        record.category = Some("Travel".to_string());
        let n = expense_decision_notification(&record, Role::Employee, Utc::now()).unwrap();
        assert_eq!(n.message, "Your Travel was approved");
    }

    #[test]
    fn test_unresolved_expense_skipped() {
        let record = expense("e3", DecisionStatus::Unrecognized, None);
        assert!(expense_decision_notification(&record, Role::Employee, Utc::now()).is_none());
    }
}
