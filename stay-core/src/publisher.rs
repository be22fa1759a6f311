use async_trait::async_trait;
use stay_shared::{Baggage, BookingMessage};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize event for {topic}: {source}")]
    Serialization {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to deliver event to {topic}: {reason}")]
    Delivery { topic: String, reason: String },
}

/// Durable, acknowledged publish of a booking topic message.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Resolves only once the broker has acknowledged the write.
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        message: &BookingMessage,
        baggage: &Baggage,
    ) -> Result<(), PublishError>;
}
