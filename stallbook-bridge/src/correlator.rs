use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Terminal outcome of a cross-service call, as seen by the waiting caller.
/// Timeouts never pass through here — the caller's deadline produces those on
/// its own side.
#[derive(Debug)]
pub enum ReplyOutcome {
    /// The full reply payload; the downstream reported success.
    Success(serde_json::Value),
    /// The downstream explicitly reported failure; message passed through.
    Failure(String),
}

struct PendingSlot {
    kind: String,
    registered_at: Instant,
    tx: oneshot::Sender<ReplyOutcome>,
}

/// Bridges synchronous callers to the asynchronous channel pair. Each
/// in-flight call owns one slot keyed by its correlation id; the reply
/// consumer resolves a slot by id and never touches any other. A single
/// shared "latest reply" cell would let concurrent callers receive each
/// other's results — hence the per-id map.
pub struct Correlator {
    pending: RwLock<HashMap<Uuid, PendingSlot>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Register a waiting slot for a fresh correlation id. The returned
    /// receiver resolves at most once; dropping it (after a timeout) makes a
    /// later `resolve` a no-op send into the void.
    pub fn register(&self, id: Uuid, kind: &str) -> oneshot::Receiver<ReplyOutcome> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.write().expect("pending lock poisoned");
        pending.insert(
            id,
            PendingSlot {
                kind: kind.to_string(),
                registered_at: Instant::now(),
                tx,
            },
        );
        rx
    }

    /// Route a reply to the slot whose id matches. Returns false when the
    /// slot is gone (timed out or never existed) — the caller logs and
    /// discards such late replies.
    pub fn resolve(&self, id: Uuid, outcome: ReplyOutcome) -> bool {
        let slot = {
            let mut pending = self.pending.write().expect("pending lock poisoned");
            pending.remove(&id)
        };
        match slot {
            Some(slot) => {
                let elapsed_ms = slot.registered_at.elapsed().as_millis() as u64;
                if slot.tx.send(outcome).is_err() {
                    // Receiver dropped between timeout and removal; same as late.
                    tracing::warn!(correlation_id = %id, kind = %slot.kind, "Reply raced a timed-out caller, dropped");
                } else {
                    tracing::debug!(correlation_id = %id, kind = %slot.kind, elapsed_ms, "Reply routed to waiting slot");
                }
                true
            }
            None => false,
        }
    }

    /// Remove a slot without resolving it. Used by the caller when its
    /// deadline fires, so a slot never lives past its own deadline.
    pub fn discard(&self, id: Uuid) -> bool {
        let mut pending = self.pending.write().expect("pending lock poisoned");
        pending.remove(&id).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().expect("pending lock poisoned").len()
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_reaches_registered_waiter() {
        let correlator = Correlator::new();
        let id = Uuid::new_v4();
        let rx = correlator.register(id, "get-identity-profile");

        assert!(correlator.resolve(id, ReplyOutcome::Success(json!({"status": "SUCCESS"}))));

        match rx.await.unwrap() {
            ReplyOutcome::Success(v) => assert_eq!(v["status"], "SUCCESS"),
            ReplyOutcome::Failure(_) => panic!("expected success"),
        }
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_slots_are_isolated() {
        let correlator = Correlator::new();
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        let rx_a = correlator.register(id_a, "create-identity");
        let rx_b = correlator.register(id_b, "create-identity");

        // Resolve in reverse registration order; each waiter must still get
        // only its own payload.
        assert!(correlator.resolve(id_b, ReplyOutcome::Success(json!({"who": "b"}))));
        assert!(correlator.resolve(id_a, ReplyOutcome::Success(json!({"who": "a"}))));

        match rx_a.await.unwrap() {
            ReplyOutcome::Success(v) => assert_eq!(v["who"], "a"),
            ReplyOutcome::Failure(_) => panic!("expected success"),
        }
        match rx_b.await.unwrap() {
            ReplyOutcome::Success(v) => assert_eq!(v["who"], "b"),
            ReplyOutcome::Failure(_) => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_late_reply_is_rejected() {
        let correlator = Correlator::new();
        let id = Uuid::new_v4();
        let rx = correlator.register(id, "delete-identity");

        // Caller gives up and removes its slot.
        assert!(correlator.discard(id));
        drop(rx);

        // The reply that arrives afterwards finds no slot.
        assert!(!correlator.resolve(id, ReplyOutcome::Success(json!({}))));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_rejected_without_touching_others() {
        let correlator = Correlator::new();
        let id = Uuid::new_v4();
        let rx = correlator.register(id, "update-identity");

        assert!(!correlator.resolve(Uuid::new_v4(), ReplyOutcome::Failure("nope".into())));
        assert_eq!(correlator.pending_count(), 1);

        assert!(correlator.resolve(id, ReplyOutcome::Failure("duplicate username".into())));
        match rx.await.unwrap() {
            ReplyOutcome::Failure(msg) => assert_eq!(msg, "duplicate username"),
            ReplyOutcome::Success(_) => panic!("expected failure"),
        }
    }
}
