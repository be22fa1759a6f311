use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use stay_core::publisher::{EventPublisher, PublishError};
use stay_shared::baggage::BAGGAGE_HEADER;
use stay_shared::{Baggage, BookingMessage};
use tracing::{error, info};

use crate::app_config::KafkaConfig;

/// Publishes booking topic messages and waits for every in-sync replica to
/// acknowledge them.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.broker_list())
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .create()?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl EventPublisher for EventProducer {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        message: &BookingMessage,
        baggage: &Baggage,
    ) -> Result<(), PublishError> {
        let payload = message.to_json().map_err(|e| {
            error!("Failed to serialize event for {}: {}", topic, e);
            PublishError::Serialization {
                topic: topic.to_string(),
                source: e,
            }
        })?;

        let mut record = FutureRecord::to(topic)
            .key(key)
            .payload(&payload);
        if !baggage.is_empty() {
            record = record.headers(OwnedHeaders::new().insert(Header {
                key: BAGGAGE_HEADER,
                value: Some(baggage.as_str()),
            }));
        }

        // Queue-full waits are bounded by message.timeout.ms
        match self.producer.send(record, Timeout::Never).await {
            Ok(delivery) => {
                info!(
                    topic = %topic,
                    key = %key,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "Event published"
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!(topic = %topic, key = %key, error = %e, "Failed to publish event");
                Err(PublishError::Delivery {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
