use async_trait::async_trait;
use crate::CoreResult;

/// A named, durable publish point. `publish` returns once the transport has
/// accepted the payload; there is no acknowledgment of downstream processing.
/// Payloads can still be lost or arbitrarily delayed by the broker.
#[async_trait]
pub trait CommandBus: Send + Sync {
    async fn publish(&self, channel: &str, key: &str, payload: &str) -> CoreResult<()>;
}
