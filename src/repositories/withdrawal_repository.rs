use crate::error::{AppError, Result};
use crate::events::OutboxEvent;
use crate::models::{Withdrawal, WithdrawalStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for Withdrawal CRUD.
pub struct WithdrawalRepository {
    pool: PgPool,
}

impl WithdrawalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, withdrawal: &Withdrawal) -> Result<Withdrawal> {
        let row = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(withdrawal.id)
        .bind(withdrawal.goal_id)
        .bind(withdrawal.owner_id)
        .bind(withdrawal.amount)
        .bind(&withdrawal.bank_code)
        .bind(&withdrawal.account_number)
        .bind(&withdrawal.account_name)
        .bind(withdrawal.status)
        .bind(withdrawal.ledger_transaction_id)
        .bind(withdrawal.created_at)
        .bind(withdrawal.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Persists the withdrawal and appends `WithdrawalRequested` to the
    /// outbox in one DB transaction, so DA never observes a withdrawal row
    /// with no corresponding event or vice versa.
    pub async fn create_with_outbox(&self, withdrawal: &Withdrawal, outbox_event: &OutboxEvent) -> Result<Withdrawal> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let row = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(withdrawal.id)
        .bind(withdrawal.goal_id)
        .bind(withdrawal.owner_id)
        .bind(withdrawal.amount)
        .bind(&withdrawal.bank_code)
        .bind(&withdrawal.account_number)
        .bind(&withdrawal.account_name)
        .bind(withdrawal.status)
        .bind(withdrawal.ledger_transaction_id)
        .bind(withdrawal.created_at)
        .bind(withdrawal.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

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

        Ok(row)
    }

    /// Same insert-plus-outbox-append as `create_with_outbox`, but against a
    /// transaction the caller already holds open — used by
    /// `GoalsService::request_withdrawal` so the insert happens before the
    /// `SELECT ... FOR UPDATE` lock on the goal row is released, instead of
    /// racing it in a disjoint transaction (§5 locking discipline).
    pub async fn create_with_outbox_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        withdrawal: &Withdrawal,
        outbox_event: &OutboxEvent,
    ) -> Result<Withdrawal> {
        let row = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(withdrawal.id)
        .bind(withdrawal.goal_id)
        .bind(withdrawal.owner_id)
        .bind(withdrawal.amount)
        .bind(&withdrawal.bank_code)
        .bind(&withdrawal.account_number)
        .bind(&withdrawal.account_name)
        .bind(withdrawal.status)
        .bind(withdrawal.ledger_transaction_id)
        .bind(withdrawal.created_at)
        .bind(withdrawal.updated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)?;

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
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Sum of amounts across PENDING/PROCESSING withdrawals for a goal — the
    /// reservation `RequestWithdrawal` subtracts from the ledger balance to
    /// derive `available_balance`.
    pub async fn sum_pending_by_goal(&self, goal_id: Uuid) -> Result<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount) FROM withdrawals
            WHERE goal_id = $1 AND status IN ('PENDING', 'PROCESSING')
            "#,
        )
        .bind(goal_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(sum.unwrap_or(0))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Withdrawal>> {
        let row = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            FROM withdrawals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_goal(&self, goal_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Withdrawal>> {
        let rows = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            FROM withdrawals
            WHERE goal_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(goal_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn attach_ledger_transaction(&self, id: Uuid, ledger_transaction_id: Uuid) -> Result<Option<Withdrawal>> {
        let row = sqlx::query_as::<_, Withdrawal>(
            r#"
            UPDATE withdrawals
            SET ledger_transaction_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(ledger_transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Atomic compare-and-set transition used by `OnWithdrawalSettled` so a
    /// duplicate disbursement webhook cannot complete the same withdrawal twice.
    pub async fn try_transition(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<Option<Withdrawal>> {
        let row = sqlx::query_as::<_, Withdrawal>(
            r#"
            UPDATE withdrawals
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING id, goal_id, owner_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
