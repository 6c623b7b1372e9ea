use crate::error::{AppError, Result};
use crate::events::OutboxEvent;
use crate::models::{Payment, PaymentStatus};
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, goal_id, contribution_id, provider_reference, amount, \
    currency, status, provider_payload, created_at, updated_at";

/// Repository for Payment CRUD plus the CAS status transition that keeps
/// `Verify` and a racing webhook from double-settling a payment (P3).
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payment: &Payment) -> Result<Payment> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (id, user_id, goal_id, contribution_id, provider_reference,
                amount, currency, status, provider_payload, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.goal_id)
        .bind(payment.contribution_id)
        .bind(&payment.provider_reference)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status)
        .bind(&payment.provider_payload)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"SELECT {COLUMNS} FROM payments WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// P1: provider_reference is unique. Used both by `Initialize` (collision
    /// check) and `Verify`/webhook lookup.
    pub async fn find_by_provider_reference(&self, provider_reference: &str) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"SELECT {COLUMNS} FROM payments WHERE provider_reference = $1"#
        ))
        .bind(provider_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Looks up the payment that was opened for a given contribution intent,
    /// used by `IngestWebhook` when the provider payload carries no payment id.
    pub async fn find_by_contribution_id(&self, contribution_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"SELECT {COLUMNS} FROM payments WHERE contribution_id = $1"#
        ))
        .bind(contribution_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Atomic compare-and-set: only succeeds if the row is still in `from`.
    /// Returns `None` on a lost race so the caller can treat the other writer's
    /// outcome as authoritative instead of re-applying its own.
    pub async fn try_transition(
        &self,
        id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Same CAS as `try_transition`, but appends the given outbox row in the
    /// same DB transaction as the status flip — the atomicity §4.1 requires
    /// so `PaymentVerified`/`PaymentFailed` can never be published for a
    /// transition that lost the race, or be missing for one that won it.
    pub async fn try_transition_with_outbox(
        &self,
        id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
        outbox_event: &OutboxEvent,
    ) -> Result<Option<Payment>> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
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
}
