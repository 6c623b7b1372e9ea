use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EntryType;

/// Topics for GoalFund domain events.
pub mod topics {
    pub const PAYMENTS: &str = "goalfund.payments";
    pub const CONTRIBUTIONS: &str = "goalfund.contributions";
    pub const WITHDRAWALS: &str = "goalfund.withdrawals";
    pub const REFUNDS: &str = "goalfund.refunds";
    pub const LEDGER: &str = "goalfund.ledger";
}

/// Type of domain event carried on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PaymentVerified,
    PaymentFailed,
    ContributionConfirmed,
    WithdrawalRequested,
    WithdrawalCompleted,
    WithdrawalFailed,
    RefundInitiated,
    RefundDisbursementRequested,
    RefundDisbursementCompleted,
    RefundDisbursementFailed,
    LedgerEntryCreated,
}

/// Envelope wrapping all events with common metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub correlation_id: Option<String>,
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(event_type: EventType, payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            source: "goalfund".to_string(),
            correlation_id: None,
            payload,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: String) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// `PaymentVerified` — emitted exactly once per payment reaching VERIFIED (P3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerifiedEvent {
    pub payment_id: Uuid,
    pub contribution_id: Uuid,
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub amount: i64,
    pub currency: String,
}

impl PaymentVerifiedEvent {
    pub fn topic() -> &'static str {
        topics::PAYMENTS
    }
}

/// `PaymentFailed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub payment_id: Uuid,
    pub reason: String,
}

impl PaymentFailedEvent {
    pub fn topic() -> &'static str {
        topics::PAYMENTS
    }
}

/// `ContributionConfirmed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionConfirmedEvent {
    pub contribution_id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
}

impl ContributionConfirmedEvent {
    pub fn topic() -> &'static str {
        topics::CONTRIBUTIONS
    }
}

/// Bank destination snapshot carried on withdrawal/refund events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankSnapshotPayload {
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
}

/// `WithdrawalRequested` — picked up by the Disbursement Adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequestedEvent {
    pub withdrawal_id: Uuid,
    pub goal_id: Uuid,
    pub owner_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub bank: BankSnapshotPayload,
}

impl WithdrawalRequestedEvent {
    pub fn topic() -> &'static str {
        topics::WITHDRAWALS
    }
}

/// `WithdrawalCompleted` / `WithdrawalFailed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalSettledEvent {
    pub withdrawal_id: Uuid,
    pub ledger_transaction_id: Option<Uuid>,
}

impl WithdrawalSettledEvent {
    pub fn topic() -> &'static str {
        topics::WITHDRAWALS
    }
}

/// `RefundInitiated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundInitiatedEvent {
    pub refund_id: Uuid,
    pub goal_id: Uuid,
    pub percentage: i32,
    pub total_amount: i64,
}

impl RefundInitiatedEvent {
    pub fn topic() -> &'static str {
        topics::REFUNDS
    }
}

/// `RefundDisbursementRequested` — one per `RefundDisbursement` row, picked up
/// by the Disbursement Adapter the same way `WithdrawalRequested` is (§4.3:
/// "DA is notified per disbursement").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundDisbursementRequestedEvent {
    pub disbursement_id: Uuid,
    pub refund_id: Uuid,
    pub contribution_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub bank: BankSnapshotPayload,
}

impl RefundDisbursementRequestedEvent {
    pub fn topic() -> &'static str {
        topics::REFUNDS
    }
}

/// `RefundDisbursementCompleted` / `RefundDisbursementFailed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundDisbursementSettledEvent {
    pub disbursement_id: Uuid,
    pub refund_id: Uuid,
    pub contribution_id: Uuid,
    pub ledger_transaction_id: Option<Uuid>,
}

impl RefundDisbursementSettledEvent {
    pub fn topic() -> &'static str {
        topics::REFUNDS
    }
}

/// One posted entry as carried on `LedgerEntryCreated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntrySummary {
    pub account_id: Uuid,
    pub entry_type: EntryType,
    pub amount: i64,
}

/// `LedgerEntryCreated` — emitted by LC within the same DB transaction as the posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntryCreatedEvent {
    pub transaction_id: Uuid,
    pub entries: Vec<LedgerEntrySummary>,
}

impl LedgerEntryCreatedEvent {
    pub fn topic() -> &'static str {
        topics::LEDGER
    }
}
