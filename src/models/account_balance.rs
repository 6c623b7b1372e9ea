use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An advisory, rebuildable cache of an account's running balance.
///
/// Never the source of truth — `LedgerService::reconcile` always recomputes from
/// `ledger_entries` and treats a mismatch against this row as fatal corruption.
/// `version` guards optimistic-concurrency updates to this row only; it says
/// nothing about the ledger entries themselves.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BalanceSnapshot {
    pub account_id: Uuid,
    pub currency: String,
    pub balance: i64,
    pub version: i32,
    pub last_updated: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(account_id: Uuid, currency: String, balance: i64) -> Self {
        Self {
            account_id,
            currency,
            balance,
            version: 0,
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_snapshot_new() {
        let snapshot = BalanceSnapshot::new(Uuid::new_v4(), "NGN".to_string(), 50_000);
        assert_eq!(snapshot.balance, 50_000);
        assert_eq!(snapshot.version, 0);
    }
}
