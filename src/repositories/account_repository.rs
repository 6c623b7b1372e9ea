use crate::error::{AppError, Result};
use crate::models::{Account, AccountType};
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for Account CRUD operations. Accounts are immutable once
/// created: there is no update path, only get-or-create on the (type,
/// entity_id, currency) uniqueness constraint (A1).
#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds an account by its UUID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, account_type, entity_id, currency, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Finds the account for a given (type, entity, currency) triple.
    pub async fn find_by_entity(
        &self,
        account_type: AccountType,
        entity_id: Uuid,
        currency: &str,
    ) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, account_type, entity_id, currency, created_at
            FROM accounts
            WHERE account_type = $1 AND entity_id = $2 AND currency = $3
            "#,
        )
        .bind(account_type)
        .bind(entity_id)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Idempotently creates an account for (type, entity, currency), relying on
    /// the unique index to no-op on a race and returning the winning row either
    /// way. This is the only write path onto `accounts`.
    pub async fn get_or_create(
        &self,
        account_type: AccountType,
        entity_id: Uuid,
        currency: &str,
    ) -> Result<Account> {
        if let Some(existing) = self.find_by_entity(account_type, entity_id, currency).await? {
            return Ok(existing);
        }

        let account = Account::new(account_type, entity_id, currency.to_string());
        let row = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, account_type, entity_id, currency, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_type, entity_id, currency) DO NOTHING
            RETURNING id, account_type, entity_id, currency, created_at
            "#,
        )
        .bind(account.id)
        .bind(account.account_type)
        .bind(account.entity_id)
        .bind(&account.currency)
        .bind(account.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        match row {
            Some(account) => Ok(account),
            None => self
                .find_by_entity(account_type, entity_id, currency)
                .await?
                .ok_or_else(|| AppError::Internal(anyhow::anyhow!("account vanished after conflict"))),
        }
    }

    /// Lists accounts of a given type (e.g. all ESCROW accounts for reconciliation sweeps).
    pub async fn list_by_type(&self, account_type: AccountType, limit: i64, offset: i64) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, account_type, entity_id, currency, created_at
            FROM accounts
            WHERE account_type = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}
