use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A notification intent persisted in the same transaction as the write it
/// announces, then drained by the outbox dispatcher. A transient broker
/// failure leaves the record pending for retry instead of losing the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub topic: String,
    pub key: String,
    pub payload: String,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutboxRecord {
    pub fn new(topic: &str, key: String, payload: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            key,
            payload,
            attempts: 0,
            next_attempt_at: now,
            dispatched_at: None,
            created_at: now,
        }
    }

    /// Exponential backoff schedule: 1s, 2s, 4s, ... capped at 5 minutes.
    pub fn backoff_seconds(attempts: i32) -> i64 {
        let exp = attempts.clamp(0, 9) as u32;
        (1i64 << exp).min(300)
    }
}
