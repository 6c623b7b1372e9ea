use crate::error::{AppError, Result};
use crate::models::{Goal, GoalStatus};
use sqlx::PgPool;
use std::future::Future;
use uuid::Uuid;

/// Repository for Goal CRUD, including the row-level lock used to serialize
/// contribution-confirmation/withdrawal/refund settlement per goal (§5).
pub struct GoalRepository {
    pool: PgPool,
}

impl GoalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, goal: &Goal) -> Result<Goal> {
        let row = sqlx::query_as::<_, Goal>(
            r#"
            INSERT INTO goals (id, owner_id, target_amount, currency, deadline, status, bank_code, account_number, account_name, fixed_contribution_amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, owner_id, target_amount, currency, deadline, status, bank_code, account_number, account_name, fixed_contribution_amount, created_at, updated_at
            "#,
        )
        .bind(goal.id)
        .bind(goal.owner_id)
        .bind(goal.target_amount)
        .bind(&goal.currency)
        .bind(goal.deadline)
        .bind(goal.status)
        .bind(&goal.bank_code)
        .bind(&goal.account_number)
        .bind(&goal.account_name)
        .bind(goal.fixed_contribution_amount)
        .bind(goal.created_at)
        .bind(goal.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Goal>> {
        let row = sqlx::query_as::<_, Goal>(
            r#"
            SELECT id, owner_id, target_amount, currency, deadline, status, bank_code, account_number, account_name, fixed_contribution_amount, created_at, updated_at
            FROM goals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Locks the goal row for the duration of the caller's transaction
    /// (`SELECT ... FOR UPDATE`), serializing concurrent settlement writers.
    pub async fn find_by_id_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
    ) -> Result<Option<Goal>> {
        let row = sqlx::query_as::<_, Goal>(
            r#"
            SELECT id, owner_id, target_amount, currency, deadline, status, bank_code, account_number, account_name, fixed_contribution_amount, created_at, updated_at
            FROM goals
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_by_owner(&self, owner_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Goal>> {
        let rows = sqlx::query_as::<_, Goal>(
            r#"
            SELECT id, owner_id, target_amount, currency, deadline, status, bank_code, account_number, account_name, fixed_contribution_amount, created_at, updated_at
            FROM goals
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Updates the mutable descriptive fields a goal owner can PATCH after
    /// creation — deadline and bank destination. Target amount and currency
    /// are immutable once set: changing them after contributions have landed
    /// would invalidate G2/G3 reasoning done against the original values.
    pub async fn update_details(
        &self,
        id: Uuid,
        deadline: Option<chrono::DateTime<chrono::Utc>>,
        bank: Option<&crate::models::BankSnapshot>,
    ) -> Result<Option<Goal>> {
        let row = sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET deadline = COALESCE($2, deadline),
                bank_code = COALESCE($3, bank_code),
                account_number = COALESCE($4, account_number),
                account_name = COALESCE($5, account_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, target_amount, currency, deadline, status, bank_code, account_number, account_name, fixed_contribution_amount, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(deadline)
        .bind(bank.map(|b| b.bank_code.clone()))
        .bind(bank.map(|b| b.account_number.clone()))
        .bind(bank.map(|b| b.account_name.clone()))
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn update_status(&self, id: Uuid, status: GoalStatus) -> Result<Option<Goal>> {
        let row = sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, target_amount, currency, deadline, status, bank_code, account_number, account_name, fixed_contribution_amount, created_at, updated_at
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
