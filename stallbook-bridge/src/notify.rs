use std::sync::Arc;
use std::time::Duration;

use stallbook_core::bus::CommandBus;
use stallbook_core::repository::OutboxRepository;
use tracing::{error, info, warn};

/// Fire-and-forget publication of domain events for side-effect consumers
/// (email). A publish failure is logged and swallowed — it must never fail
/// the operation that triggered it.
pub struct NotificationDispatcher {
    bus: Arc<dyn CommandBus>,
}

impl NotificationDispatcher {
    pub fn new(bus: Arc<dyn CommandBus>) -> Self {
        Self { bus }
    }

    pub async fn publish<T: serde::Serialize>(&self, topic: &str, key: &str, event: &T) {
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!(topic, "Failed to serialize notification event: {}", e);
                return;
            }
        };
        if let Err(e) = self.bus.publish(topic, key, &payload).await {
            warn!(topic, key, "Notification publish failed, event dropped: {}", e);
        }
    }
}

/// Drains the transactional outbox: reservation events are persisted with the
/// row that caused them, then published here with retry and backoff, so a
/// transient broker outage delays a notification instead of losing it.
pub struct OutboxDispatcher {
    outbox: Arc<dyn OutboxRepository>,
    bus: Arc<dyn CommandBus>,
    poll_interval: Duration,
    batch_size: i64,
}

impl OutboxDispatcher {
    pub fn new(
        outbox: Arc<dyn OutboxRepository>,
        bus: Arc<dyn CommandBus>,
        poll_interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            outbox,
            bus,
            poll_interval,
            batch_size,
        }
    }

    pub async fn run(self) {
        info!(poll_interval = ?self.poll_interval, "Outbox dispatcher started");
        loop {
            self.drain_once().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One polling pass. Returns how many records were dispatched.
    pub async fn drain_once(&self) -> usize {
        let batch = match self.outbox.pending_batch(self.batch_size).await {
            Ok(batch) => batch,
            Err(e) => {
                error!("Failed to fetch outbox batch: {}", e);
                return 0;
            }
        };

        let mut dispatched = 0;
        for record in batch {
            match self.bus.publish(&record.topic, &record.key, &record.payload).await {
                Ok(()) => {
                    if let Err(e) = self.outbox.mark_dispatched(record.id).await {
                        // Will be re-published on the next pass; consumers
                        // must tolerate the duplicate.
                        error!(outbox_id = %record.id, "Dispatched but not marked: {}", e);
                    } else {
                        dispatched += 1;
                    }
                }
                Err(e) => {
                    warn!(outbox_id = %record.id, topic = %record.topic, attempts = record.attempts, "Outbox publish failed: {}", e);
                    if let Err(e) = self.outbox.record_failure(record.id).await {
                        error!(outbox_id = %record.id, "Failed to record outbox failure: {}", e);
                    }
                }
            }
        }
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBus;
    use stallbook_core::outbox::OutboxRecord;
    use stallbook_core::repository::OutboxRepository;
    use stallbook_store::memory::MemoryStore;

    fn record(topic: &str) -> OutboxRecord {
        OutboxRecord::new(topic, "key-1".to_string(), "{\"hello\":true}".to_string())
    }

    #[tokio::test]
    async fn test_dispatcher_swallows_publish_failure() {
        let bus = Arc::new(InMemoryBus::new());
        bus.set_failing(true);
        let dispatcher = NotificationDispatcher::new(bus.clone());

        // Must not panic or error out.
        dispatcher
            .publish("account.created", "u-1", &serde_json::json!({"username": "ravi"}))
            .await;
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_drain_marks_dispatched() {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(InMemoryBus::new());
        store.enqueue_outbox(record("reservation.confirmed"));

        let dispatcher = OutboxDispatcher::new(store.clone(), bus.clone(), Duration::from_millis(10), 16);
        assert_eq!(dispatcher.drain_once().await, 1);

        assert_eq!(bus.published_on("reservation.confirmed").len(), 1);
        assert!(store.pending_batch(16).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_publish_stays_pending_with_backoff() {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(InMemoryBus::new());
        bus.set_failing(true);
        let rec = record("reservation.confirmed");
        let id = rec.id;
        store.enqueue_outbox(rec);

        let dispatcher = OutboxDispatcher::new(store.clone(), bus.clone(), Duration::from_millis(10), 16);
        assert_eq!(dispatcher.drain_once().await, 0);

        let snapshot = store.outbox_snapshot();
        let rec = snapshot.iter().find(|r| r.id == id).unwrap();
        assert_eq!(rec.attempts, 1);
        assert!(rec.dispatched_at.is_none());
        assert!(rec.next_attempt_at > chrono::Utc::now());

        // Not due yet, so the next pass picks up nothing.
        assert!(store.pending_batch(16).await.unwrap().is_empty());

        // Once the broker recovers and the backoff elapses it goes out.
        bus.set_failing(false);
        store.force_due(id);
        assert_eq!(dispatcher.drain_once().await, 1);
        assert_eq!(bus.published_on("reservation.confirmed").len(), 1);
    }
}
