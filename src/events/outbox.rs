use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::events::{EventProducer, EventType};

/// A domain event queued for publication, written in the same DB transaction
/// as the state change that produced it (the transactional outbox pattern):
/// the write and the event append either both commit or both roll back, so a
/// consumer never observes a state change with no corresponding event, or an
/// event for a change that didn't happen.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub event_type: EventType,
    pub topic: String,
    pub payload: serde_json::Value,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub fn new(event_type: EventType, topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            topic: topic.into(),
            payload,
            published_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Repository for the outbox table. `append` is meant to be called with a
/// transaction already open for the state change it accompanies; `claim_batch`
/// and `mark_published` back the background pump.
pub struct OutboxRepository {
    pool: PgPool,
}

impl OutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an event row within the caller's open transaction.
    pub async fn append(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: &OutboxEvent,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outbox_events (id, event_type, topic, payload, published_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id)
        .bind(event.event_type)
        .bind(&event.topic)
        .bind(&event.payload)
        .bind(event.published_at)
        .bind(event.created_at)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Locks up to `limit` unpublished rows, oldest first, skipping rows a
    /// concurrent pump instance already has locked, and hands them to `f`
    /// still inside the transaction holding the row locks. Each row is marked
    /// published only after `f` accepts it, so a send failure midway through
    /// the batch leaves the unsent remainder locked-then-released for retry
    /// on the next tick rather than silently skipped.
    pub async fn claim_and_publish<F, Fut>(&self, limit: i64, mut f: F) -> Result<usize>
    where
        F: FnMut(OutboxEvent) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let rows = sqlx::query_as::<_, OutboxEvent>(
            r#"
            SELECT id, event_type, topic, payload, published_at, created_at
            FROM outbox_events
            WHERE published_at IS NULL
            ORDER BY created_at
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let mut published = 0;
        for row in rows {
            let id = row.id;
            f(row).await?;

            sqlx::query("UPDATE outbox_events SET published_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;

            published += 1;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(published)
    }

    pub async fn count_unpublished(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM outbox_events WHERE published_at IS NULL"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }
}

/// Background pump: polls the outbox on an interval and drains it to the bus.
/// At-least-once: a crash between `send` succeeding and `mark_published`
/// committing redelivers the event, which is why every consumer dedups on
/// `event_id` via the idempotency store (§4.4).
pub struct OutboxPump {
    repository: OutboxRepository,
    producer: std::sync::Arc<EventProducer>,
    batch_size: i64,
    poll_interval: std::time::Duration,
}

impl OutboxPump {
    pub fn new(
        repository: OutboxRepository,
        producer: std::sync::Arc<EventProducer>,
        batch_size: i64,
        poll_interval: std::time::Duration,
    ) -> Self {
        Self {
            repository,
            producer,
            batch_size,
            poll_interval,
        }
    }

    /// Drains at most one batch. Returns the number of events published.
    ///
    /// The wire payload wraps the domain body in a self-describing envelope
    /// (`event_id`, `event_type`, `payload`) — the raw body alone doesn't say
    /// what kind of event it is, and a topic can carry more than one type
    /// (e.g. `goalfund.refunds` carries `RefundInitiated`,
    /// `RefundDisbursementRequested`, and the disbursement-settled events), so
    /// the consumer needs this to dispatch correctly.
    pub async fn drain_once(&self) -> Result<usize> {
        let producer = &self.producer;
        self.repository
            .claim_and_publish(self.batch_size, |event| async move {
                let key = event.id.to_string();
                let wire = serde_json::json!({
                    "event_id": event.id,
                    "event_type": event.event_type,
                    "timestamp": event.created_at,
                    "payload": event.payload,
                });
                producer
                    .send_raw(&event.topic, Some(&key), wire.to_string().into_bytes())
                    .await?;
                Ok(())
            })
            .await
    }

    /// Runs the drain loop until the process shuts down.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            match self.drain_once().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!(published = n, "outbox pump drained events"),
                Err(err) => tracing::error!(error = %err, "outbox pump failed to drain batch"),
            }
        }
    }
}
