use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of money-movement group posted to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerTransactionType {
    /// ESCROW -> GOAL, on a verified contribution payment.
    Contribution,
    /// GOAL -> ESCROW, on a completed withdrawal.
    Withdrawal,
    /// GOAL -> USER, on a settled refund disbursement.
    Refund,
}

/// A money-movement group: the atomic unit `PostTransaction` writes, together
/// with its entries. Immutable once created (T3): partial transactions are
/// never observable because the row and its entries commit in one DB write.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub transaction_type: LedgerTransactionType,
    pub description: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub idempotency_key: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    pub fn new(
        transaction_type: LedgerTransactionType,
        amount: i64,
        currency: String,
        idempotency_key: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_type,
            description: None,
            amount,
            currency,
            idempotency_key,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_transaction_new() {
        let tx = LedgerTransaction::new(
            LedgerTransactionType::Contribution,
            50_000,
            "NGN".to_string(),
            Some("payment-id-123".to_string()),
        );
        assert_eq!(tx.amount, 50_000);
        assert_eq!(tx.transaction_type, LedgerTransactionType::Contribution);
    }
}
