use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::goal::BankSnapshot;

/// Lifecycle state shared by a Refund and each of its RefundDisbursements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "refund_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RefundStatus {
    /// PENDING -> PROCESSING -> {COMPLETED | FAILED}.
    pub fn can_transition(&self, to: RefundStatus) -> bool {
        matches!(
            (self, to),
            (RefundStatus::Pending, RefundStatus::Processing)
                | (RefundStatus::Processing, RefundStatus::Completed)
                | (RefundStatus::Processing, RefundStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RefundStatus::Completed | RefundStatus::Failed)
    }
}

/// Per-goal refund fan-out request (R1, R2).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Refund {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub initiated_by: Uuid,
    pub percentage: i32,
    pub total_amount: i64,
    pub reason: Option<String>,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Refund {
    pub fn new(goal_id: Uuid, initiated_by: Uuid, percentage: i32, total_amount: i64, reason: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            goal_id,
            initiated_by,
            percentage,
            total_amount,
            reason,
            status: RefundStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One contributor's settlement leg of a Refund (R3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefundDisbursement {
    pub id: Uuid,
    pub refund_id: Uuid,
    pub contribution_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
    pub status: RefundStatus,
    pub ledger_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefundDisbursement {
    pub fn new(
        refund_id: Uuid,
        contribution_id: Uuid,
        user_id: Uuid,
        amount: i64,
        bank: BankSnapshot,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            refund_id,
            contribution_id,
            user_id,
            amount,
            bank_code: bank.bank_code,
            account_number: bank.account_number,
            account_name: bank.account_name,
            status: RefundStatus::Pending,
            ledger_transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `amount = floor(contribution.amount * percentage / 100)` — native integer
    /// arithmetic, no rounding ambiguity (R3).
    pub fn calculate_amount(contribution_amount: i64, percentage: i32) -> i64 {
        (contribution_amount * percentage as i64) / 100
    }
}
