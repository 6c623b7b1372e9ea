use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Account, AccountType, Contribution, ContributionStatus, Goal, GoalStatus, Payment,
    PaymentStatus, Refund, RefundDisbursement, RefundStatus, Withdrawal, WithdrawalStatus,
};
use crate::services::InitializeResult;

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Error response structure, used for request-validation failures (400) that
/// a handler rejects before reaching a service — `AppError` carries its own
/// response body for everything past that point (see `error.rs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<ValidationErrorDetail>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Validation error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

impl From<crate::api::requests::ValidationError> for ValidationErrorDetail {
    fn from(e: crate::api::requests::ValidationError) -> Self {
        Self { field: e.field, message: e.message }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceHealth,
}

/// Service health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub database: bool,
    pub redis: bool,
    pub kafka: bool,
}

/// Account response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub account_type: AccountType,
    pub entity_id: Uuid,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_type: account.account_type,
            entity_id: account.entity_id,
            currency: account.currency,
            created_at: account.created_at,
        }
    }
}

/// Balance response DTO. `balance` is the current ledger balance in minor
/// units — positive for debit-normal accounts (GOAL, USER), negative
/// outstanding for ESCROW once funds have moved out to a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account_id: Uuid,
    pub currency: String,
    pub balance: i64,
}

/// Goal response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalResponse {
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

impl From<Goal> for GoalResponse {
    fn from(g: Goal) -> Self {
        Self {
            id: g.id,
            owner_id: g.owner_id,
            target_amount: g.target_amount,
            currency: g.currency,
            deadline: g.deadline,
            status: g.status,
            bank_code: g.bank_code,
            account_number: g.account_number,
            account_name: g.account_name,
            fixed_contribution_amount: g.fixed_contribution_amount,
            created_at: g.created_at,
            updated_at: g.updated_at,
        }
    }
}

/// Contribution response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionResponse {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub amount: i64,
    pub status: ContributionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Contribution> for ContributionResponse {
    fn from(c: Contribution) -> Self {
        Self {
            id: c.id,
            goal_id: c.goal_id,
            user_id: c.user_id,
            payment_id: c.payment_id,
            amount: c.amount,
            status: c.status,
            created_at: c.created_at,
        }
    }
}

/// `POST /payments/initialize` response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializePaymentResponse {
    pub payment_id: Uuid,
    pub authorization_url: String,
    pub reference: String,
}

impl From<InitializeResult> for InitializePaymentResponse {
    fn from(r: InitializeResult) -> Self {
        Self {
            payment_id: r.payment_id,
            authorization_url: r.authorization_url,
            reference: r.reference,
        }
    }
}

/// Payment response DTO, used by `GET /payments/verify/{reference}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub contribution_id: Uuid,
    pub provider_reference: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            goal_id: p.goal_id,
            contribution_id: p.contribution_id,
            provider_reference: p.provider_reference,
            amount: p.amount,
            currency: p.currency,
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Withdrawal response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub owner_id: Uuid,
    pub amount: i64,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(w: Withdrawal) -> Self {
        Self {
            id: w.id,
            goal_id: w.goal_id,
            owner_id: w.owner_id,
            amount: w.amount,
            bank_code: w.bank_code,
            account_number: w.account_number,
            account_name: w.account_name,
            status: w.status,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

/// One settlement leg of a refund fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundDisbursementResponse {
    pub id: Uuid,
    pub contribution_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub status: RefundStatus,
}

impl From<RefundDisbursement> for RefundDisbursementResponse {
    fn from(d: RefundDisbursement) -> Self {
        Self {
            id: d.id,
            contribution_id: d.contribution_id,
            user_id: d.user_id,
            amount: d.amount,
            status: d.status,
        }
    }
}

/// Refund response DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub initiated_by: Uuid,
    pub percentage: i32,
    pub total_amount: i64,
    pub reason: Option<String>,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Refund> for RefundResponse {
    fn from(r: Refund) -> Self {
        Self {
            id: r.id,
            goal_id: r.goal_id,
            initiated_by: r.initiated_by,
            percentage: r.percentage,
            total_amount: r.total_amount,
            reason: r.reason,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

/// Paginated list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub limit: i64,
    pub offset: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, limit: i64, offset: i64) -> Self {
        Self { items, limit, offset }
    }
}
