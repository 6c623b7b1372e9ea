use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::BankSnapshot;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// `POST /payments/initialize` request body (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializePaymentRequest {
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub contribution_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub email: String,
    pub callback_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl InitializePaymentRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.amount <= 0 {
            errors.push(ValidationError::new("amount", "amount must be positive"));
        }
        if self.currency.len() != 3 {
            errors.push(ValidationError::new("currency", "currency must be a 3-letter ISO 4217 code"));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            errors.push(ValidationError::new("email", "email must be a well-formed address"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Raw bank destination as carried in request bodies (`BankSnapshot` minus
/// format validation, which happens in `BankSnapshot::validate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDetailsRequest {
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
}

impl From<BankDetailsRequest> for BankSnapshot {
    fn from(b: BankDetailsRequest) -> Self {
        BankSnapshot {
            bank_code: b.bank_code,
            account_number: b.account_number,
            account_name: b.account_name,
        }
    }
}

/// `POST /goals` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGoalRequest {
    pub owner_id: Uuid,
    pub target_amount: i64,
    pub currency: String,
    pub deadline: Option<DateTime<Utc>>,
    pub bank: Option<BankDetailsRequest>,
    pub fixed_contribution_amount: Option<i64>,
}

impl CreateGoalRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.target_amount <= 0 {
            errors.push(ValidationError::new("target_amount", "target_amount must be positive"));
        }
        if self.currency.len() != 3 {
            errors.push(ValidationError::new("currency", "currency must be a 3-letter ISO 4217 code"));
        }
        if let Some(fixed) = self.fixed_contribution_amount {
            if fixed <= 0 {
                errors.push(ValidationError::new(
                    "fixed_contribution_amount",
                    "fixed_contribution_amount must be positive",
                ));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// `PATCH /goals/{id}` request body. Only deadline and bank destination are
/// mutable after creation — see `GoalRepository::update_details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGoalRequest {
    pub owner_id: Uuid,
    pub deadline: Option<DateTime<Utc>>,
    pub bank: Option<BankDetailsRequest>,
}

/// `POST /goals/{id}/close` / `POST /goals/{id}/cancel` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalActionRequest {
    pub owner_id: Uuid,
}

/// `POST /goals/{id}/contributions` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContributionRequest {
    pub user_id: Uuid,
    pub amount: i64,
}

impl CreateContributionRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.amount <= 0 {
            errors.push(ValidationError::new("amount", "amount must be positive"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// `POST /goals/{id}/withdrawals` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWithdrawalRequest {
    pub owner_id: Uuid,
    pub amount: i64,
    pub bank: Option<BankDetailsRequest>,
}

impl CreateWithdrawalRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.amount <= 0 {
            errors.push(ValidationError::new("amount", "amount must be positive"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// `POST /goals/{id}/refunds` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRefundRequest {
    pub initiated_by: Uuid,
    pub percentage: i32,
    pub reason: Option<String>,
}

impl CreateRefundRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if !(1..=100).contains(&self.percentage) {
            errors.push(ValidationError::new("percentage", "percentage must be in (0, 100]"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Query parameters shared by the listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
