use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stallbook_core::outbox::OutboxRecord;
use stallbook_core::repository::OutboxRepository;
use stallbook_core::{CoreError, CoreResult};

fn internal(e: sqlx::Error) -> CoreError {
    CoreError::Internal(e.to_string())
}

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    topic: String,
    key: String,
    payload: String,
    attempts: i32,
    next_attempt_at: DateTime<Utc>,
    dispatched_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<OutboxRow> for OutboxRecord {
    fn from(row: OutboxRow) -> Self {
        OutboxRecord {
            id: row.id,
            topic: row.topic,
            key: row.key,
            payload: row.payload,
            attempts: row.attempts,
            next_attempt_at: row.next_attempt_at,
            dispatched_at: row.dispatched_at,
            created_at: row.created_at,
        }
    }
}

pub struct PgOutboxRepository {
    pool: PgPool,
}

impl PgOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxRepository for PgOutboxRepository {
    async fn pending_batch(&self, limit: i64) -> CoreResult<Vec<OutboxRecord>> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            "SELECT id, topic, key, payload, attempts, next_attempt_at, dispatched_at, created_at \
             FROM outbox \
             WHERE dispatched_at IS NULL AND next_attempt_at <= NOW() \
             ORDER BY created_at ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(internal)?;
        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }

    async fn mark_dispatched(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("UPDATE outbox SET dispatched_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn record_failure(&self, id: Uuid) -> CoreResult<()> {
        // Same backoff curve as OutboxRecord::backoff_seconds, computed in SQL
        // so the bump is one round trip.
        sqlx::query(
            "UPDATE outbox \
             SET attempts = attempts + 1, \
                 next_attempt_at = NOW() + (LEAST(POWER(2, LEAST(attempts, 9)), 300) * INTERVAL '1 second') \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(internal)?;
        Ok(())
    }
}
