use std::sync::Arc;

use rdkafka::message::Message;
use tracing::{error, info, warn};

use stallbook_bridge::request::parse_reply;
use stallbook_bridge::Correlator;
use stallbook_core::bus::CommandBus;
use stallbook_reserve::VendorReservationService;
use stallbook_shared::models::messages::channels;
use stallbook_store::events::build_consumer;

/// Consumes every identity reply channel and routes each payload to the slot
/// whose correlation id matches. A reply whose slot is already gone — the
/// caller timed out, or the id is unknown — is logged and discarded; the
/// caller was told "unknown outcome" and resurrecting the slot would lie.
pub async fn start_reply_consumer(brokers: String, group_id: String, correlator: Arc<Correlator>) {
    let consumer = build_consumer(&brokers, &group_id, &channels::REPLY_CHANNELS)
        .expect("Reply consumer creation failed");

    info!("Reply consumer started, listening on identity reply channels...");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                let Some(Ok(payload)) = m.payload_view::<str>() else {
                    warn!("Reply with unreadable payload, skipping");
                    continue;
                };
                match parse_reply(payload) {
                    Ok(envelope) => {
                        if !correlator.resolve(envelope.correlation_id, envelope.outcome) {
                            warn!(
                                correlation_id = %envelope.correlation_id,
                                "Late or unknown reply, discarding"
                            );
                        }
                    }
                    Err(e) => warn!("Malformed reply payload: {}", e),
                }
            }
        }
    }
}

/// The serving side of get-vendor-reservations: the identity service asks,
/// we answer with the vendor's reservations on the paired reply channel.
pub async fn start_vendor_reservations_responder(
    brokers: String,
    group_id: String,
    service: Arc<VendorReservationService>,
    bus: Arc<dyn CommandBus>,
) {
    let consumer = build_consumer(&brokers, &group_id, &[channels::GET_VENDOR_RESERVATIONS])
        .expect("Vendor reservations consumer creation failed");

    info!("Vendor reservations responder started...");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                let Some(Ok(payload)) = m.payload_view::<str>() else {
                    warn!("Request with unreadable payload, skipping");
                    continue;
                };
                let reply = service.handle_request(payload).await;
                let key = reply["correlationId"].as_str().unwrap_or_default().to_string();
                if let Err(e) = bus
                    .publish(channels::GET_VENDOR_RESERVATIONS_REPLY, &key, &reply.to_string())
                    .await
                {
                    error!(correlation_id = %key, "Failed to publish vendor reservations reply: {}", e);
                }
            }
        }
    }
}
