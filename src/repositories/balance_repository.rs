use crate::error::{AppError, Result};
use crate::models::BalanceSnapshot;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for `BalanceSnapshot` rows: an advisory, optimistically-locked
/// cache over the ledger, never the source of truth. `Reconcile` compares a row
/// here against `LedgerRepository::compute_balance` and corrects drift.
pub struct BalanceSnapshotRepository {
    pool: PgPool,
}

impl BalanceSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_account(&self, account_id: Uuid, currency: &str) -> Result<Option<BalanceSnapshot>> {
        let row = sqlx::query_as::<_, BalanceSnapshot>(
            r#"
            SELECT account_id, currency, balance, version, last_updated
            FROM balance_snapshots
            WHERE account_id = $1 AND currency = $2
            "#,
        )
        .bind(account_id)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn get_or_create(&self, account_id: Uuid, currency: &str) -> Result<BalanceSnapshot> {
        if let Some(existing) = self.find_by_account(account_id, currency).await? {
            return Ok(existing);
        }

        let snapshot = BalanceSnapshot::new(account_id, currency.to_string(), 0);
        let row = sqlx::query_as::<_, BalanceSnapshot>(
            r#"
            INSERT INTO balance_snapshots (account_id, currency, balance, version, last_updated)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_id, currency) DO NOTHING
            RETURNING account_id, currency, balance, version, last_updated
            "#,
        )
        .bind(snapshot.account_id)
        .bind(&snapshot.currency)
        .bind(snapshot.balance)
        .bind(snapshot.version)
        .bind(snapshot.last_updated)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        match row {
            Some(snapshot) => Ok(snapshot),
            None => self
                .find_by_account(account_id, currency)
                .await?
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("balance snapshot vanished after conflict"))),
        }
    }

    /// Applies a signed delta (positive for credit, negative for debit) with
    /// optimistic-locking via `version`. Returns `None` on a concurrent write
    /// race; the caller retries.
    pub async fn apply_delta(
        &self,
        account_id: Uuid,
        currency: &str,
        delta: i64,
        expected_version: i32,
    ) -> Result<Option<BalanceSnapshot>> {
        let row = sqlx::query_as::<_, BalanceSnapshot>(
            r#"
            UPDATE balance_snapshots
            SET balance = balance + $3,
                version = version + 1,
                last_updated = NOW()
            WHERE account_id = $1 AND currency = $2 AND version = $4
            RETURNING account_id, currency, balance, version, last_updated
            "#,
        )
        .bind(account_id)
        .bind(currency)
        .bind(delta)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Overwrites a drifted snapshot with the ledger-recomputed balance, bumping
    /// the version so concurrent cache-aside readers notice.
    pub async fn reconcile_to(&self, account_id: Uuid, currency: &str, correct_balance: i64) -> Result<BalanceSnapshot> {
        let row = sqlx::query_as::<_, BalanceSnapshot>(
            r#"
            UPDATE balance_snapshots
            SET balance = $3,
                version = version + 1,
                last_updated = NOW()
            WHERE account_id = $1 AND currency = $2
            RETURNING account_id, currency, balance, version, last_updated
            "#,
        )
        .bind(account_id)
        .bind(currency)
        .bind(correct_balance)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
