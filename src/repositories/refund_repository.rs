use crate::error::{AppError, Result};
use crate::events::OutboxEvent;
use crate::models::{Refund, RefundDisbursement, RefundStatus};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for Refund CRUD.
pub struct RefundRepository {
    pool: PgPool,
}

impl RefundRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, refund: &Refund) -> Result<Refund> {
        let row = sqlx::query_as::<_, Refund>(
            r#"
            INSERT INTO refunds (id, goal_id, initiated_by, percentage, total_amount, reason, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, goal_id, initiated_by, percentage, total_amount, reason, status, created_at, updated_at
            "#,
        )
        .bind(refund.id)
        .bind(refund.goal_id)
        .bind(refund.initiated_by)
        .bind(refund.percentage)
        .bind(refund.total_amount)
        .bind(&refund.reason)
        .bind(refund.status)
        .bind(refund.created_at)
        .bind(refund.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Refund>> {
        let row = sqlx::query_as::<_, Refund>(
            r#"
            SELECT id, goal_id, initiated_by, percentage, total_amount, reason, status, created_at, updated_at
            FROM refunds
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Persists the refund, its per-contribution disbursements, and the
    /// outbox events (`RefundInitiated` plus one `RefundDisbursementRequested`
    /// per disbursement) as one atomic write (§4.3: "all inserts happen
    /// atomically").
    pub async fn create_with_disbursements(
        &self,
        refund: &Refund,
        disbursements: &[RefundDisbursement],
        outbox_events: &[OutboxEvent],
    ) -> Result<(Refund, Vec<RefundDisbursement>)> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let refund_row = sqlx::query_as::<_, Refund>(
            r#"
            INSERT INTO refunds (id, goal_id, initiated_by, percentage, total_amount, reason, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, goal_id, initiated_by, percentage, total_amount, reason, status, created_at, updated_at
            "#,
        )
        .bind(refund.id)
        .bind(refund.goal_id)
        .bind(refund.initiated_by)
        .bind(refund.percentage)
        .bind(refund.total_amount)
        .bind(&refund.reason)
        .bind(refund.status)
        .bind(refund.created_at)
        .bind(refund.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let mut disbursement_rows = Vec::with_capacity(disbursements.len());
        for disbursement in disbursements {
            let row = sqlx::query_as::<_, RefundDisbursement>(
                r#"
                INSERT INTO refund_disbursements (id, refund_id, contribution_id, user_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING id, refund_id, contribution_id, user_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
                "#,
            )
            .bind(disbursement.id)
            .bind(disbursement.refund_id)
            .bind(disbursement.contribution_id)
            .bind(disbursement.user_id)
            .bind(disbursement.amount)
            .bind(&disbursement.bank_code)
            .bind(&disbursement.account_number)
            .bind(&disbursement.account_name)
            .bind(disbursement.status)
            .bind(disbursement.ledger_transaction_id)
            .bind(disbursement.created_at)
            .bind(disbursement.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;
            disbursement_rows.push(row);
        }

        for outbox_event in outbox_events {
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
        }

        tx.commit().await.map_err(AppError::Database)?;

        Ok((refund_row, disbursement_rows))
    }

    /// R2: a goal may have at most one non-terminal refund in flight.
    pub async fn find_active_by_goal(&self, goal_id: Uuid) -> Result<Option<Refund>> {
        let row = sqlx::query_as::<_, Refund>(
            r#"
            SELECT id, goal_id, initiated_by, percentage, total_amount, reason, status, created_at, updated_at
            FROM refunds
            WHERE goal_id = $1 AND status IN ('PENDING', 'PROCESSING')
            LIMIT 1
            "#,
        )
        .bind(goal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn update_status(&self, id: Uuid, status: RefundStatus) -> Result<Option<Refund>> {
        let row = sqlx::query_as::<_, Refund>(
            r#"
            UPDATE refunds
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, goal_id, initiated_by, percentage, total_amount, reason, status, created_at, updated_at
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

/// Repository for RefundDisbursement CRUD: the per-contributor settlement legs
/// a Refund fans out into (R3).
pub struct RefundDisbursementRepository {
    pool: PgPool,
}

impl RefundDisbursementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, disbursement: &RefundDisbursement) -> Result<RefundDisbursement> {
        let row = sqlx::query_as::<_, RefundDisbursement>(
            r#"
            INSERT INTO refund_disbursements (id, refund_id, contribution_id, user_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, refund_id, contribution_id, user_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(disbursement.id)
        .bind(disbursement.refund_id)
        .bind(disbursement.contribution_id)
        .bind(disbursement.user_id)
        .bind(disbursement.amount)
        .bind(&disbursement.bank_code)
        .bind(&disbursement.account_number)
        .bind(&disbursement.account_name)
        .bind(disbursement.status)
        .bind(disbursement.ledger_transaction_id)
        .bind(disbursement.created_at)
        .bind(disbursement.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RefundDisbursement>> {
        let row = sqlx::query_as::<_, RefundDisbursement>(
            r#"
            SELECT id, refund_id, contribution_id, user_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            FROM refund_disbursements
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_refund(&self, refund_id: Uuid) -> Result<Vec<RefundDisbursement>> {
        let rows = sqlx::query_as::<_, RefundDisbursement>(
            r#"
            SELECT id, refund_id, contribution_id, user_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            FROM refund_disbursements
            WHERE refund_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(refund_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Atomic compare-and-set transition used by `OnRefundDisbursementSettled`.
    pub async fn try_transition(
        &self,
        id: Uuid,
        from: RefundStatus,
        to: RefundStatus,
        ledger_transaction_id: Option<Uuid>,
    ) -> Result<Option<RefundDisbursement>> {
        let row = sqlx::query_as::<_, RefundDisbursement>(
            r#"
            UPDATE refund_disbursements
            SET status = $3,
                ledger_transaction_id = COALESCE($4, ledger_transaction_id),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING id, refund_id, contribution_id, user_id, amount, bank_code, account_number, account_name, status, ledger_transaction_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(ledger_transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
