use crate::error::{AppError, Result};
use crate::events::OutboxEvent;
use crate::models::{Contribution, ContributionStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for Contribution CRUD.
pub struct ContributionRepository {
    pool: PgPool,
}

impl ContributionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, contribution: &Contribution) -> Result<Contribution> {
        let row = sqlx::query_as::<_, Contribution>(
            r#"
            INSERT INTO contributions (id, goal_id, user_id, payment_id, amount, status, ledger_transaction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, goal_id, user_id, payment_id, amount, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(contribution.id)
        .bind(contribution.goal_id)
        .bind(contribution.user_id)
        .bind(contribution.payment_id)
        .bind(contribution.amount)
        .bind(contribution.status)
        .bind(contribution.ledger_transaction_id)
        .bind(contribution.created_at)
        .bind(contribution.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Contribution>> {
        let row = sqlx::query_as::<_, Contribution>(
            r#"
            SELECT id, goal_id, user_id, payment_id, amount, status, ledger_transaction_id, created_at, updated_at
            FROM contributions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_goal(&self, goal_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Contribution>> {
        let rows = sqlx::query_as::<_, Contribution>(
            r#"
            SELECT id, goal_id, user_id, payment_id, amount, status, ledger_transaction_id, created_at, updated_at
            FROM contributions
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

    /// Lists confirmed contributions for a goal — the exact set a refund fans
    /// out disbursements over (R2).
    pub async fn find_confirmed_by_goal(&self, goal_id: Uuid) -> Result<Vec<Contribution>> {
        let rows = sqlx::query_as::<_, Contribution>(
            r#"
            SELECT id, goal_id, user_id, payment_id, amount, status, ledger_transaction_id, created_at, updated_at
            FROM contributions
            WHERE goal_id = $1 AND status = 'CONFIRMED'
            ORDER BY created_at
            "#,
        )
        .bind(goal_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Atomic compare-and-set transition, paired with the ledger transaction id
    /// the confirmation posted, so `OnPaymentVerified` is safe to retry under
    /// at-least-once event delivery (C2).
    pub async fn try_confirm(
        &self,
        id: Uuid,
        ledger_transaction_id: Uuid,
    ) -> Result<Option<Contribution>> {
        let row = sqlx::query_as::<_, Contribution>(
            r#"
            UPDATE contributions
            SET status = 'CONFIRMED', ledger_transaction_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING id, goal_id, user_id, payment_id, amount, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(ledger_transaction_id)
        .bind(ContributionStatus::Pending)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Same CAS as `try_confirm`, plus the `ContributionConfirmed` outbox
    /// append in the same transaction, so the event can never be lost
    /// between the confirm and the append. Also stamps `payment_id` so a
    /// confirmed contribution always carries the payment that funded it.
    pub async fn try_confirm_with_outbox(
        &self,
        id: Uuid,
        payment_id: Uuid,
        ledger_transaction_id: Uuid,
        outbox_event: &OutboxEvent,
    ) -> Result<Option<Contribution>> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let row = sqlx::query_as::<_, Contribution>(
            r#"
            UPDATE contributions
            SET status = 'CONFIRMED', payment_id = $2, ledger_transaction_id = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING id, goal_id, user_id, payment_id, amount, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(payment_id)
        .bind(ledger_transaction_id)
        .bind(ContributionStatus::Pending)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if row.is_none() {
            tx.rollback().await.map_err(AppError::Database)?;
            return Ok(None);
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

        Ok(row)
    }

    pub async fn update_status(&self, id: Uuid, status: ContributionStatus) -> Result<Option<Contribution>> {
        let row = sqlx::query_as::<_, Contribution>(
            r#"
            UPDATE contributions
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, goal_id, user_id, payment_id, amount, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
