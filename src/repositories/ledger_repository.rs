use crate::error::{AppError, Result};
use crate::events::OutboxEvent;
use crate::models::{EntryType, LedgerEntry, LedgerTransaction, LedgerTransactionType};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for LedgerTransaction + LedgerEntry writes and reads. Entries are
/// append-only (L2): there is no update or delete path on this type anywhere
/// in the repository.
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes a transaction and its (already balance-validated) entries in one
    /// DB transaction, so a reader never observes a transaction with a partial
    /// entry set (T3).
    pub async fn create_transaction_with_entries(
        &self,
        transaction: &LedgerTransaction,
        entries: &[LedgerEntry],
    ) -> Result<(LedgerTransaction, Vec<LedgerEntry>)> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let created_transaction = sqlx::query_as::<_, LedgerTransaction>(
            r#"
            INSERT INTO ledger_transactions (id, transaction_type, description, amount, currency, idempotency_key, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, transaction_type, description, amount, currency, idempotency_key, metadata, created_at
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.transaction_type)
        .bind(&transaction.description)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(&transaction.idempotency_key)
        .bind(&transaction.metadata)
        .bind(transaction.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let mut created_entries = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = sqlx::query_as::<_, LedgerEntry>(
                r#"
                INSERT INTO ledger_entries (id, transaction_id, account_id, entry_type, amount, currency, description, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id, transaction_id, account_id, entry_type, amount, currency, description, created_at
                "#,
            )
            .bind(entry.id)
            .bind(entry.transaction_id)
            .bind(entry.account_id)
            .bind(entry.entry_type)
            .bind(entry.amount)
            .bind(&entry.currency)
            .bind(&entry.description)
            .bind(entry.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

            created_entries.push(row);
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok((created_transaction, created_entries))
    }

    /// Same as `create_transaction_with_entries`, but also appends the given
    /// outbox row in the same DB transaction (§5: "PostTransaction = single DB
    /// transaction with outbox append in same transaction"). Used by
    /// `LedgerService::post_transaction` so `LedgerEntryCreated` can never be
    /// published for a posting that didn't actually commit, or be missing for
    /// one that did.
    pub async fn create_transaction_with_entries_and_outbox(
        &self,
        transaction: &LedgerTransaction,
        entries: &[LedgerEntry],
        outbox_event: &OutboxEvent,
    ) -> Result<(LedgerTransaction, Vec<LedgerEntry>)> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let created_transaction = sqlx::query_as::<_, LedgerTransaction>(
            r#"
            INSERT INTO ledger_transactions (id, transaction_type, description, amount, currency, idempotency_key, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, transaction_type, description, amount, currency, idempotency_key, metadata, created_at
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.transaction_type)
        .bind(&transaction.description)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(&transaction.idempotency_key)
        .bind(&transaction.metadata)
        .bind(transaction.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let mut created_entries = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = sqlx::query_as::<_, LedgerEntry>(
                r#"
                INSERT INTO ledger_entries (id, transaction_id, account_id, entry_type, amount, currency, description, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id, transaction_id, account_id, entry_type, amount, currency, description, created_at
                "#,
            )
            .bind(entry.id)
            .bind(entry.transaction_id)
            .bind(entry.account_id)
            .bind(entry.entry_type)
            .bind(entry.amount)
            .bind(&entry.currency)
            .bind(&entry.description)
            .bind(entry.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

            created_entries.push(row);
        }

        sqlx::query(
            r#"
            INSERT INTO outbox_events (id, event_type, topic, payload, published_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(outbox_event.id)
        .bind(outbox_event.event_type)
        .bind(&outbox_event.topic)
        .bind(&outbox_event.payload)
        .bind(outbox_event.published_at)
        .bind(outbox_event.created_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok((created_transaction, created_entries))
    }

    pub async fn find_transaction_by_id(&self, id: Uuid) -> Result<Option<LedgerTransaction>> {
        let row = sqlx::query_as::<_, LedgerTransaction>(
            r#"
            SELECT id, transaction_type, description, amount, currency, idempotency_key, metadata, created_at
            FROM ledger_transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_transaction_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<LedgerTransaction>> {
        let row = sqlx::query_as::<_, LedgerTransaction>(
            r#"
            SELECT id, transaction_type, description, amount, currency, idempotency_key, metadata, created_at
            FROM ledger_transactions
            WHERE idempotency_key = $1
            "#,
        )
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_entries_by_transaction(&self, transaction_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, transaction_id, account_id, entry_type, amount, currency, description, created_at
            FROM ledger_entries
            WHERE transaction_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Finds entries for an account with pagination, newest first.
    pub async fn find_entries_by_account(
        &self,
        account_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, transaction_id, account_id, entry_type, amount, currency, description, created_at
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn count_entries_by_account(&self, account_id: Uuid) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM ledger_entries
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }

    /// Recomputes an account's balance as signed sum of its entries — the
    /// authoritative source `LedgerService::reconcile` compares the cached
    /// `BalanceSnapshot` against (§4.2, Reconcile).
    pub async fn compute_balance(&self, account_id: Uuid, currency: &str) -> Result<i64> {
        let row: (Option<i64>,) = sqlx::query_as(
            r#"
            SELECT SUM(
                CASE entry_type
                    WHEN 'CREDIT' THEN amount
                    WHEN 'DEBIT' THEN -amount
                END
            )
            FROM ledger_entries
            WHERE account_id = $1 AND currency = $2
            "#,
        )
        .bind(account_id)
        .bind(currency)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0.unwrap_or(0))
    }

    /// Verifies that debits equal credits for a transaction (T1, the invariant
    /// `PostTransaction` checks in-process before ever reaching the database).
    pub async fn verify_transaction_balance(&self, transaction_id: Uuid) -> Result<bool> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN entry_type = 'DEBIT' THEN amount ELSE 0 END), 0) as debits,
                COALESCE(SUM(CASE WHEN entry_type = 'CREDIT' THEN amount ELSE 0 END), 0) as credits
            FROM ledger_entries
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0 == row.1)
    }

    /// Sums entries of a given type for an account (used by `GoalFund` progress
    /// displays: confirmed-contribution total per goal).
    pub async fn sum_by_account_and_type(
        &self,
        account_id: Uuid,
        currency: &str,
        entry_type: EntryType,
    ) -> Result<i64> {
        let row: (Option<i64>,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM ledger_entries
            WHERE account_id = $1 AND currency = $2 AND entry_type = $3
            "#,
        )
        .bind(account_id)
        .bind(currency)
        .bind(entry_type)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0.unwrap_or(0))
    }

    /// Finds transactions of a given type created within a time range, e.g. for
    /// the EBA outbox-age audit or periodic reconciliation sweeps.
    pub async fn find_transactions_by_time_range(
        &self,
        transaction_type: LedgerTransactionType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LedgerTransaction>> {
        let rows = sqlx::query_as::<_, LedgerTransaction>(
            r#"
            SELECT id, transaction_type, description, amount, currency, idempotency_key, metadata, created_at
            FROM ledger_transactions
            WHERE transaction_type = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY created_at
            LIMIT $4
            "#,
        )
        .bind(transaction_type)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}
