use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role an account plays in the ledger. Determines the fixed posting convention
/// used by `services::ledger_service` and `services::goals_service` — see the
/// flow table in the account-posting-conventions section of the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Holds a contributing user's settlement leg (refund destination).
    User,
    /// Holds a single goal's claim on funds raised so far.
    Goal,
    /// Holds provider funds the platform controls but does not own.
    Escrow,
    /// Holds platform revenue (fees), not used by the core flows in this crate.
    Revenue,
}

/// Entity id for the platform's single pooled ESCROW account per currency.
/// There is one provider-funds account per currency, not one per goal or
/// user, so it has no natural owning entity — `Uuid::nil()` stands in for
/// "the platform itself".
pub const PLATFORM_ESCROW_ENTITY_ID: Uuid = Uuid::nil();

/// A ledger bucket. Unique on `(account_type, entity_id, currency)` — see
/// invariant A1.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub account_type: AccountType,
    pub entity_id: Uuid,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(account_type: AccountType, entity_id: Uuid, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_type,
            entity_id,
            currency,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_creation() {
        let entity_id = Uuid::new_v4();
        let account = Account::new(AccountType::Goal, entity_id, "NGN".to_string());

        assert_eq!(account.account_type, AccountType::Goal);
        assert_eq!(account.entity_id, entity_id);
        assert_eq!(account.currency, "NGN");
    }

    #[test]
    fn test_account_serialization() {
        let account = Account::new(AccountType::Escrow, Uuid::new_v4(), "NGN".to_string());
        let json = serde_json::to_string(&account).unwrap();
        let deserialized: Account = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.account_type, account.account_type);
        assert_eq!(deserialized.entity_id, account.entity_id);
    }
}
