use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a contribution (linking a payment to a goal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contribution_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionStatus {
    Pending,
    Confirmed,
    Failed,
    Refunded,
}

impl ContributionStatus {
    /// PENDING -> CONFIRMED -> REFUNDED (terminal); PENDING -> FAILED (terminal).
    pub fn can_transition(&self, to: ContributionStatus) -> bool {
        matches!(
            (self, to),
            (ContributionStatus::Pending, ContributionStatus::Confirmed)
                | (ContributionStatus::Pending, ContributionStatus::Failed)
                | (ContributionStatus::Confirmed, ContributionStatus::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ContributionStatus::Failed | ContributionStatus::Refunded)
    }
}

/// Intent + confirmation linking one payment to one goal (C1-C3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contribution {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub amount: i64,
    pub status: ContributionStatus,
    pub ledger_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contribution {
    /// Mints the contribution id up front so it can be threaded through
    /// `Initialize`'s metadata and echoed back on `PaymentVerified` (§9).
    pub fn new(goal_id: Uuid, user_id: Uuid, amount: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            goal_id,
            user_id,
            payment_id: None,
            amount,
            status: ContributionStatus::Pending,
            ledger_transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution_status_transitions() {
        assert!(ContributionStatus::Pending.can_transition(ContributionStatus::Confirmed));
        assert!(ContributionStatus::Pending.can_transition(ContributionStatus::Failed));
        assert!(ContributionStatus::Confirmed.can_transition(ContributionStatus::Refunded));
        assert!(!ContributionStatus::Failed.can_transition(ContributionStatus::Confirmed));
        assert!(!ContributionStatus::Refunded.can_transition(ContributionStatus::Confirmed));
    }

    #[test]
    fn test_contribution_new_is_pending_without_payment() {
        let c = Contribution::new(Uuid::new_v4(), Uuid::new_v4(), 50_000);
        assert_eq!(c.status, ContributionStatus::Pending);
        assert!(c.payment_id.is_none());
    }
}
