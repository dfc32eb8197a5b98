use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::correlator::{Correlator, ReplyOutcome};
use stallbook_core::bus::CommandBus;
use stallbook_core::CoreError;
use stallbook_shared::models::messages::STATUS_SUCCESS;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Downstream failure: {0}")]
    Remote(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed reply: {0}")]
    Envelope(String),
}

impl From<BridgeError> for CoreError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Timeout(_) => CoreError::Timeout("no reply from downstream service".to_string()),
            BridgeError::Remote(msg) => CoreError::Remote(msg),
            BridgeError::Transport(msg) => CoreError::Internal(msg),
            BridgeError::Envelope(msg) => CoreError::Internal(msg),
        }
    }
}

/// A reply payload decomposed into its routing id and terminal outcome.
pub struct ReplyEnvelope {
    pub correlation_id: Uuid,
    pub outcome: ReplyOutcome,
}

/// Parse a raw reply-channel payload. A reply whose `status` is anything but
/// SUCCESS is a downstream-reported failure; the message rides along.
pub fn parse_reply(payload: &str) -> Result<ReplyEnvelope, BridgeError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| BridgeError::Envelope(format!("invalid JSON: {}", e)))?;

    let correlation_id = value
        .get("correlationId")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| BridgeError::Envelope("missing or invalid correlationId".to_string()))?;

    let status = value.get("status").and_then(Value::as_str).unwrap_or("");
    let outcome = if status == STATUS_SUCCESS {
        ReplyOutcome::Success(value)
    } else {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("downstream reported status {:?}", status));
        ReplyOutcome::Failure(message)
    };

    Ok(ReplyEnvelope { correlation_id, outcome })
}

/// Turns a fire-and-forget channel pair into a synchronous-feeling call:
/// correlation id in, async suspension on a per-id slot, reply or deadline
/// out. The wait is a oneshot await, not a poll loop, so no worker is pinned
/// for the round trip.
pub struct RequestBridge {
    bus: Arc<dyn CommandBus>,
    correlator: Arc<Correlator>,
    reply_timeout: Duration,
}

impl RequestBridge {
    pub fn new(bus: Arc<dyn CommandBus>, correlator: Arc<Correlator>, reply_timeout: Duration) -> Self {
        Self {
            bus,
            correlator,
            reply_timeout,
        }
    }

    pub fn correlator(&self) -> Arc<Correlator> {
        self.correlator.clone()
    }

    /// Publish `payload` on `channel` and wait for the matching reply under
    /// the bridge's configured deadline.
    pub async fn call(&self, channel: &str, kind: &str, payload: Value) -> Result<Value, BridgeError> {
        self.call_with_deadline(channel, kind, payload, self.reply_timeout).await
    }

    /// As `call`, with an explicit deadline. The slot is removed on every
    /// exit path; a timed-out call leaves the downstream side effect in an
    /// unknown state and the caller is told so by the distinct Timeout
    /// variant.
    pub async fn call_with_deadline(
        &self,
        channel: &str,
        kind: &str,
        mut payload: Value,
        deadline: Duration,
    ) -> Result<Value, BridgeError> {
        let correlation_id = Uuid::new_v4();
        payload["correlationId"] = json!(correlation_id);

        let rx = self.correlator.register(correlation_id, kind);

        tracing::debug!(%correlation_id, channel, kind, "Publishing command");
        if let Err(e) = self
            .bus
            .publish(channel, &correlation_id.to_string(), &payload.to_string())
            .await
        {
            self.correlator.discard(correlation_id);
            return Err(BridgeError::Transport(e.to_string()));
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(ReplyOutcome::Success(body))) => Ok(body),
            Ok(Ok(ReplyOutcome::Failure(message))) => Err(BridgeError::Remote(message)),
            Ok(Err(_)) => {
                // Sender dropped without resolving; treat as transport loss.
                self.correlator.discard(correlation_id);
                Err(BridgeError::Transport("reply slot closed before resolution".to_string()))
            }
            Err(_) => {
                self.correlator.discard(correlation_id);
                tracing::warn!(%correlation_id, channel, kind, timeout = ?deadline, "No reply before deadline");
                Err(BridgeError::Timeout(deadline))
            }
        }
    }
}
