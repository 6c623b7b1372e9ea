use crate::error::{AppError, Result};
use crate::models::WebhookEvent;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "id, provider_event_id, event_type, payload, signature, signature_valid, \
    processed, received_at, processed_at";

/// Repository for WebhookEvent rows. `provider_event_id` is unique (W1): a
/// replayed delivery hits the conflict branch and is recognized as a duplicate
/// without reprocessing (W2).
pub struct WebhookEventRepository {
    pool: PgPool,
}

impl WebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the event if `provider_event_id` hasn't been seen before.
    /// Returns `None` when it already exists — the caller's signal to treat
    /// this delivery as a duplicate.
    pub async fn record_if_new(&self, event: &WebhookEvent) -> Result<Option<WebhookEvent>> {
        let row = sqlx::query_as::<_, WebhookEvent>(&format!(
            r#"
            INSERT INTO webhook_events (id, provider_event_id, event_type, payload, signature,
                signature_valid, processed, received_at, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (provider_event_id) DO NOTHING
            RETURNING {COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.provider_event_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(&event.signature)
        .bind(event.signature_valid)
        .bind(event.processed)
        .bind(event.received_at)
        .bind(event.processed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_provider_event_id(&self, provider_event_id: &str) -> Result<Option<WebhookEvent>> {
        let row = sqlx::query_as::<_, WebhookEvent>(&format!(
            r#"SELECT {COLUMNS} FROM webhook_events WHERE provider_event_id = $1"#
        ))
        .bind(provider_event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn mark_processed(&self, id: Uuid) -> Result<Option<WebhookEvent>> {
        let row = sqlx::query_as::<_, WebhookEvent>(&format!(
            r#"
            UPDATE webhook_events
            SET processed = TRUE, processed_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
