use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::goal::BankSnapshot;

/// Lifecycle state of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "withdrawal_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl WithdrawalStatus {
    /// PENDING -> PROCESSING -> {COMPLETED | FAILED}.
    pub fn can_transition(&self, to: WithdrawalStatus) -> bool {
        matches!(
            (self, to),
            (WithdrawalStatus::Pending, WithdrawalStatus::Processing)
                | (WithdrawalStatus::Processing, WithdrawalStatus::Completed)
                | (WithdrawalStatus::Processing, WithdrawalStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Completed | WithdrawalStatus::Failed)
    }
}

/// A goal owner's request to pull accumulated funds out (Wd1, Wd2).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Withdrawal {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub owner_id: Uuid,
    pub amount: i64,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
    pub status: WithdrawalStatus,
    pub ledger_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn new(goal_id: Uuid, owner_id: Uuid, amount: i64, bank: BankSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            goal_id,
            owner_id,
            amount,
            bank_code: bank.bank_code,
            account_number: bank.account_number,
            account_name: bank.account_name,
            status: WithdrawalStatus::Pending,
            ledger_transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn bank_snapshot(&self) -> BankSnapshot {
        BankSnapshot {
            bank_code: self.bank_code.clone(),
            account_number: self.account_number.clone(),
            account_name: self.account_name.clone(),
        }
    }
}
