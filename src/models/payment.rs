use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of an inbound payment (P2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Initialized,
    Pending,
    Verified,
    Failed,
}

impl PaymentStatus {
    /// INITIALIZED -> PENDING -> {VERIFIED, FAILED}. VERIFIED/FAILED are terminal;
    /// the CAS update enforced by the repository makes this the only path a
    /// concurrent Verify-call race can take (P3).
    pub fn can_transition(&self, to: PaymentStatus) -> bool {
        matches!(
            (self, to),
            (PaymentStatus::Initialized, PaymentStatus::Pending)
                | (PaymentStatus::Pending, PaymentStatus::Verified)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Initialized, PaymentStatus::Verified)
                | (PaymentStatus::Initialized, PaymentStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Verified | PaymentStatus::Failed)
    }
}

/// An inbound payment against a provider reference (P1-P3). Carries the
/// contribution id minted at `CreateContributionIntent` so `OnPaymentVerified`
/// can look the contribution back up without a foreign key the provider never
/// echoes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub contribution_id: Uuid,
    pub provider_reference: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        user_id: Uuid,
        goal_id: Uuid,
        contribution_id: Uuid,
        provider_reference: String,
        amount: i64,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            goal_id,
            contribution_id,
            provider_reference,
            amount,
            currency,
            status: PaymentStatus::Initialized,
            provider_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.provider_payload = Some(payload);
        self
    }
}
