use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a funding goal (G1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "goal_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    Open,
    Closed,
    Cancelled,
}

impl GoalStatus {
    /// OPEN -> {CLOSED, CANCELLED}; CLOSED -> CANCELLED; CANCELLED is terminal.
    pub fn can_transition(&self, to: GoalStatus) -> bool {
        matches!(
            (self, to),
            (GoalStatus::Open, GoalStatus::Closed)
                | (GoalStatus::Open, GoalStatus::Cancelled)
                | (GoalStatus::Closed, GoalStatus::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GoalStatus::Cancelled)
    }
}

/// A snapshot of the bank destination a goal owner or contributor settles to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankSnapshot {
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
}

impl BankSnapshot {
    /// Validates the format required by RequestWithdrawal: 10-digit account number,
    /// non-empty bank code and account name.
    pub fn validate(&self) -> Result<(), String> {
        if self.bank_code.trim().is_empty() {
            return Err("bank_code cannot be empty".to_string());
        }
        if self.account_name.trim().is_empty() {
            return Err("account_name cannot be empty".to_string());
        }
        if self.account_number.len() != 10 || !self.account_number.chars().all(|c| c.is_ascii_digit()) {
            return Err("account_number must be exactly 10 digits".to_string());
        }
        Ok(())
    }
}

/// A group-funding campaign. Owns one ledger Account of type GOAL per currency.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Goal {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub target_amount: i64,
    pub currency: String,
    pub deadline: Option<DateTime<Utc>>,
    pub status: GoalStatus,
    pub bank_code: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub fixed_contribution_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(
        owner_id: Uuid,
        target_amount: i64,
        currency: String,
        deadline: Option<DateTime<Utc>>,
        bank: Option<BankSnapshot>,
        fixed_contribution_amount: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            target_amount,
            currency,
            deadline,
            status: GoalStatus::Open,
            bank_code: bank.as_ref().map(|b| b.bank_code.clone()),
            account_number: bank.as_ref().map(|b| b.account_number.clone()),
            account_name: bank.as_ref().map(|b| b.account_name.clone()),
            fixed_contribution_amount,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn bank_snapshot(&self) -> Option<BankSnapshot> {
        match (&self.bank_code, &self.account_number, &self.account_name) {
            (Some(code), Some(number), Some(name)) => Some(BankSnapshot {
                bank_code: code.clone(),
                account_number: number.clone(),
                account_name: name.clone(),
            }),
            _ => None,
        }
    }
}
