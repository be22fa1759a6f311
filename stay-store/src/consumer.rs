//! Environment-scoped consumption of the booking topics.
//!
//! Every environment sharing the cluster runs its own consumer group, so each
//! one sees every message. The divert tag in a message's baggage decides
//! which of them actually handles it. Offsets are only ever committed by
//! hand: a message whose handler fails is rewound and redelivered until it
//! succeeds.

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Headers, Message};
use rdkafka::Offset;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use stay_core::repository::{BookingSink, CancellationSink, RepositoryError};
use stay_shared::baggage::BAGGAGE_HEADER;
use stay_shared::models::events::{BOOKING_CANCELLATIONS_TOPIC, BOOKING_EVENTS_TOPIC};
use stay_shared::{Baggage, BookingEvent, CancellationEvent};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::app_config::Config;

const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Decides whether this process is the intended recipient of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivertPolicy {
    environment: String,
}

impl DivertPolicy {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into().trim().to_string(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Diverted messages go only to the matching environment; untagged
    /// messages go only to the baseline (untagged) instance.
    pub fn accepts(&self, baggage: &Baggage) -> bool {
        match baggage.divert() {
            Some(tag) => tag == self.environment,
            None => self.environment.is_empty(),
        }
    }
}

/// What to do with a message's offset once it has been looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled; advance the offset.
    Commit,
    /// Not ours; leave the offset alone and move on.
    Skip,
    /// Handling failed; do not advance, redeliver the same message.
    Retry,
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("message has no payload")]
    EmptyPayload,
    #[error("failed to decode {topic} message: {source}")]
    Decode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Routing and dispatch for a single message, independent of the broker.
pub struct MessageRouter {
    policy: DivertPolicy,
    booking_topic: String,
    cancellation_topic: String,
    bookings: Arc<dyn BookingSink>,
    cancellations: Arc<dyn CancellationSink>,
}

impl MessageRouter {
    pub fn new(
        policy: DivertPolicy,
        bookings: Arc<dyn BookingSink>,
        cancellations: Arc<dyn CancellationSink>,
    ) -> Self {
        Self {
            policy,
            booking_topic: BOOKING_EVENTS_TOPIC.to_string(),
            cancellation_topic: BOOKING_CANCELLATIONS_TOPIC.to_string(),
            bookings,
            cancellations,
        }
    }

    pub fn with_topics(mut self, booking_topic: &str, cancellation_topic: &str) -> Self {
        self.booking_topic = booking_topic.to_string();
        self.cancellation_topic = cancellation_topic.to_string();
        self
    }

    pub fn policy(&self) -> &DivertPolicy {
        &self.policy
    }

    pub fn topics(&self) -> [&str; 2] {
        [&self.booking_topic, &self.cancellation_topic]
    }

    pub async fn route(&self, topic: &str, payload: Option<&[u8]>, baggage: &Baggage) -> Disposition {
        if !self.policy.accepts(baggage) {
            info!(
                topic = %topic,
                divert = baggage.divert().unwrap_or_default(),
                environment = %self.policy.environment(),
                "Message not meant for this environment, not committing"
            );
            return Disposition::Skip;
        }

        let result = if topic == self.booking_topic {
            self.handle_booking(topic, payload, baggage).await
        } else if topic == self.cancellation_topic {
            self.handle_cancellation(topic, payload, baggage).await
        } else {
            error!(topic = %topic, "Unknown topic");
            return Disposition::Skip;
        };

        match result {
            Ok(()) => {
                info!(topic = %topic, "Message processed successfully");
                Disposition::Commit
            }
            Err(e) => {
                error!(topic = %topic, error = %e, "Failed to handle message, leaving it for retry");
                Disposition::Retry
            }
        }
    }

    async fn handle_booking(
        &self,
        topic: &str,
        payload: Option<&[u8]>,
        baggage: &Baggage,
    ) -> Result<(), HandlerError> {
        let event: BookingEvent = decode(topic, payload)?;
        info!(
            booking_id = %event.booking_id,
            user_id = %event.user_id,
            room_id = %event.room_id,
            payment_id = %event.payment_id,
            guests = event.guests,
            "Processing booking event"
        );
        self.bookings.create_booking(&event, baggage).await?;
        Ok(())
    }

    async fn handle_cancellation(
        &self,
        topic: &str,
        payload: Option<&[u8]>,
        baggage: &Baggage,
    ) -> Result<(), HandlerError> {
        let event: CancellationEvent = decode(topic, payload)?;
        info!(
            booking_id = %event.booking_id,
            user_id = %event.user_id,
            requested_at = %event.timestamp,
            "Processing cancellation event"
        );
        self.cancellations.cancel_booking(&event, baggage).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(topic: &str, payload: Option<&[u8]>) -> Result<T, HandlerError> {
    let bytes = payload.ok_or(HandlerError::EmptyPayload)?;
    serde_json::from_slice(bytes).map_err(|source| HandlerError::Decode {
        topic: topic.to_string(),
        source,
    })
}

/// The `baggage` header of a record, or empty baggage.
pub fn baggage_from_headers<M: Message>(message: &M) -> Baggage {
    message
        .headers()
        .and_then(|headers| {
            headers
                .iter()
                .find(|header| header.key == BAGGAGE_HEADER)
                .and_then(|header| header.value)
        })
        .map(|value| Baggage::new(String::from_utf8_lossy(value).into_owned()))
        .unwrap_or_default()
}

/// Long-lived consumer-group member for one environment.
pub struct EnvironmentConsumer {
    consumer: StreamConsumer,
    router: MessageRouter,
    group_id: String,
    retry_backoff: Duration,
}

impl EnvironmentConsumer {
    pub fn new(config: &Config, router: MessageRouter) -> Result<Self, KafkaError> {
        let group_id = config.divert.group_id();

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.kafka.broker_list())
            .set("group.id", &group_id)
            // Offsets move only when we say so
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", &config.worker.auto_offset_reset)
            .set("partition.assignment.strategy", "roundrobin")
            .set("enable.partition.eof", "false")
            .create()?;

        Ok(Self {
            consumer,
            router,
            group_id,
            retry_backoff: Duration::from_millis(config.worker.retry_backoff_ms),
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Consume until `shutdown` flips to `true` (or its sender goes away).
    ///
    /// A message that is already being handled is always finished before the
    /// loop exits, so a store write is never abandoned halfway.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), KafkaError> {
        let topics = self.router.topics();
        self.consumer.subscribe(&topics)?;

        info!(
            group_id = %self.group_id,
            topics = ?topics,
            environment = %self.router.policy().environment(),
            "Starting Kafka consumer group"
        );

        while !*shutdown.borrow() {
            let received = tokio::select! {
                _ = shutdown.changed() => break,
                received = self.consumer.recv() => received,
            };

            match received {
                Ok(message) => self.process(&message, &mut shutdown).await,
                Err(e) => error!(error = %e, "Error from consumer group"),
            }
        }

        // Leaving the group promptly hands our partitions to the other members.
        self.consumer.unsubscribe();
        info!(group_id = %self.group_id, "Kafka consumer group closed");
        Ok(())
    }

    async fn process(&self, message: &BorrowedMessage<'_>, shutdown: &mut watch::Receiver<bool>) {
        let baggage = baggage_from_headers(message);
        let key = message.key().map(String::from_utf8_lossy).unwrap_or_default();

        info!(
            topic = message.topic(),
            key = %key,
            partition = message.partition(),
            offset = message.offset(),
            "Received message"
        );

        match self.router.route(message.topic(), message.payload(), &baggage).await {
            Disposition::Commit => {
                if let Err(e) = self.consumer.commit_message(message, CommitMode::Sync) {
                    warn!(
                        topic = message.topic(),
                        partition = message.partition(),
                        offset = message.offset(),
                        error = %e,
                        "Failed to commit offset (message may be redelivered)"
                    );
                }
            }
            Disposition::Skip => {}
            Disposition::Retry => {
                info!(
                    topic = message.topic(),
                    partition = message.partition(),
                    offset = message.offset(),
                    "Message not committed, rewinding for redelivery"
                );
                if let Err(e) = self.consumer.seek(
                    message.topic(),
                    message.partition(),
                    Offset::Offset(message.offset()),
                    SEEK_TIMEOUT,
                ) {
                    error!(error = %e, "Failed to rewind partition; message will be redelivered after rebalance");
                }
                tokio::select! {
                    _ = tokio::time::sleep(self.retry_backoff) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_repo::MemoryBookingRepository;
    use chrono::{Duration as ChronoDuration, Utc};
    use rdkafka::message::{Header, OwnedHeaders, OwnedMessage};
    use rdkafka::Timestamp;
    use stay_core::repository::BookingStatus;

    fn booking_payload(booking_id: &str, room_id: &str) -> Vec<u8> {
        let start = Utc::now() + ChronoDuration::days(5);
        serde_json::to_vec(&BookingEvent {
            user_id: "alice@example.com".into(),
            room_id: room_id.into(),
            guests: 2,
            start_date: start,
            end_date: start + ChronoDuration::days(1),
            booking_id: booking_id.into(),
            payment_id: "pay_7".into(),
        })
        .unwrap()
    }

    async fn store() -> Arc<MemoryBookingRepository> {
        let repo = Arc::new(MemoryBookingRepository::new());
        repo.add_user(1, "alice", "alice@example.com").await;
        repo.add_room("ROOM-101").await;
        repo
    }

    fn router(environment: &str, repo: &Arc<MemoryBookingRepository>) -> MessageRouter {
        MessageRouter::new(DivertPolicy::new(environment), repo.clone(), repo.clone())
    }

    #[test]
    fn test_divert_rules() {
        let staging = Baggage::from("okteto-divert=staging");
        let untagged = Baggage::from("traceparent=abc");

        assert!(DivertPolicy::new("staging").accepts(&staging));
        assert!(!DivertPolicy::new("").accepts(&staging));
        assert!(!DivertPolicy::new("prod").accepts(&staging));

        assert!(DivertPolicy::new("").accepts(&untagged));
        assert!(DivertPolicy::new("").accepts(&Baggage::empty()));
        assert!(!DivertPolicy::new("staging").accepts(&untagged));
    }

    #[tokio::test]
    async fn test_diverted_message_only_reaches_its_environment() {
        let payload = booking_payload("booking_1_abcdef", "ROOM-101");
        let baggage = Baggage::from("okteto-divert=staging");

        for env in ["", "prod"] {
            let repo = store().await;
            let disposition = router(env, &repo).route("booking-events", Some(&payload), &baggage).await;
            assert_eq!(disposition, Disposition::Skip);
            assert_eq!(repo.booking_count().await, 0);
        }

        let repo = store().await;
        let disposition = router("staging", &repo).route("booking-events", Some(&payload), &baggage).await;
        assert_eq!(disposition, Disposition::Commit);
        assert_eq!(repo.booking("booking_1_abcdef").await.unwrap().status, BookingStatus::Accepted);
    }

    #[tokio::test]
    async fn test_untagged_message_only_reaches_baseline() {
        let payload = booking_payload("booking_2_abcdef", "ROOM-101");

        let repo = store().await;
        let disposition = router("staging", &repo).route("booking-events", Some(&payload), &Baggage::empty()).await;
        assert_eq!(disposition, Disposition::Skip);

        let repo = store().await;
        let disposition = router("", &repo).route("booking-events", Some(&payload), &Baggage::empty()).await;
        assert_eq!(disposition, Disposition::Commit);
        assert_eq!(repo.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_handler_is_retried_until_it_succeeds() {
        let repo = store().await;
        let router = router("", &repo);
        let payload = booking_payload("booking_3_abcdef", "ROOM-202");

        let first = router.route("booking-events", Some(&payload), &Baggage::empty()).await;
        assert_eq!(first, Disposition::Retry);
        assert_eq!(repo.booking_count().await, 0);

        // the missing room shows up; same message redelivered
        repo.add_room("ROOM-202").await;
        let second = router.route("booking-events", Some(&payload), &Baggage::empty()).await;
        assert_eq!(second, Disposition::Commit);
        assert_eq!(repo.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancellation_is_dispatched_by_topic() {
        let repo = store().await;
        let router = router("", &repo);
        router
            .route("booking-events", Some(&booking_payload("b-1", "ROOM-101")), &Baggage::empty())
            .await;

        let cancel = serde_json::to_vec(&CancellationEvent {
            booking_id: "b-1".into(),
            user_id: "alice@example.com".into(),
            timestamp: Utc::now(),
        })
        .unwrap();

        let disposition = router.route("booking-cancellations", Some(&cancel), &Baggage::empty()).await;
        assert_eq!(disposition, Disposition::Commit);
        assert_eq!(repo.booking("b-1").await.unwrap().status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancellation_before_booking_is_retried() {
        let repo = store().await;
        let cancel = serde_json::to_vec(&CancellationEvent {
            booking_id: "b-late".into(),
            user_id: "alice".into(),
            timestamp: Utc::now(),
        })
        .unwrap();

        let disposition = router("", &repo).route("booking-cancellations", Some(&cancel), &Baggage::empty()).await;
        assert_eq!(disposition, Disposition::Retry);
    }

    #[tokio::test]
    async fn test_bad_payloads_and_unknown_topics() {
        let repo = store().await;
        let router = router("", &repo).with_topics("dev.bookings", "dev.cancels");

        assert_eq!(router.topics(), ["dev.bookings", "dev.cancels"]);
        assert_eq!(router.route("dev.bookings", Some(b"{not json"), &Baggage::empty()).await, Disposition::Retry);
        assert_eq!(router.route("dev.bookings", None, &Baggage::empty()).await, Disposition::Retry);
        assert_eq!(
            router.route("booking-events", Some(&booking_payload("x", "ROOM-101")), &Baggage::empty()).await,
            Disposition::Skip
        );
    }

    #[test]
    fn test_baggage_is_read_from_record_headers() {
        let headers = OwnedHeaders::new()
            .insert(Header { key: "traceparent", value: Some("00-abc") })
            .insert(Header { key: BAGGAGE_HEADER, value: Some("okteto-divert=alice") });
        let message = OwnedMessage::new(
            Some(b"{}".to_vec()),
            Some(b"booking_1_abcdef".to_vec()),
            "booking-events".to_string(),
            Timestamp::NotAvailable,
            0,
            42,
            Some(headers),
        );

        assert_eq!(baggage_from_headers(&message).divert(), Some("alice"));

        let bare = OwnedMessage::new(None, None, "booking-events".to_string(), Timestamp::NotAvailable, 0, 43, None);
        assert!(baggage_from_headers(&bare).is_empty());
    }
}
