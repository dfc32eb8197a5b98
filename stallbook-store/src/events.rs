use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

use stallbook_core::bus::CommandBus;
use stallbook_core::{CoreError, CoreResult};

#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
}

impl KafkaProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl CommandBus for KafkaProducer {
    async fn publish(&self, channel: &str, key: &str, payload: &str) -> CoreResult<()> {
        let record = FutureRecord::to(channel).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok((partition, offset)) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    channel, key, partition, offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", channel, e);
                Err(CoreError::Internal(e.to_string()))
            }
        }
    }
}

/// Consumer factory for the background workers; each worker owns its own
/// subscription.
pub fn build_consumer(
    brokers: &str,
    group_id: &str,
    channels: &[&str],
) -> Result<StreamConsumer, rdkafka::error::KafkaError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()?;

    consumer.subscribe(channels)?;
    Ok(consumer)
}
