use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use stallbook_core::bus::CommandBus;
use stallbook_core::{CoreError, CoreResult};

#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub channel: String,
    pub key: String,
    pub payload: String,
}

/// Loopback bus for tests and local development: records every publish and
/// rebroadcasts it to subscribers so a test can play the downstream service.
pub struct InMemoryBus {
    messages: Mutex<Vec<PublishedMessage>>,
    tx: broadcast::Sender<PublishedMessage>,
    failing: AtomicBool,
}

impl InMemoryBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            messages: Mutex::new(Vec::new()),
            tx,
            failing: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.tx.subscribe()
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.messages.lock().expect("messages lock poisoned").clone()
    }

    pub fn published_on(&self, channel: &str) -> Vec<PublishedMessage> {
        self.published()
            .into_iter()
            .filter(|m| m.channel == channel)
            .collect()
    }

    /// Make every subsequent publish fail, to exercise transport-error paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandBus for InMemoryBus {
    async fn publish(&self, channel: &str, key: &str, payload: &str) -> CoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Internal("simulated broker failure".to_string()));
        }
        let message = PublishedMessage {
            channel: channel.to_string(),
            key: key.to_string(),
            payload: payload.to_string(),
        };
        self.messages.lock().expect("messages lock poisoned").push(message.clone());
        // No subscribers is fine; the record above is still kept.
        let _ = self.tx.send(message);
        Ok(())
    }
}
