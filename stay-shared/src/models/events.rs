use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BOOKING_EVENTS_TOPIC: &str = "booking-events";
pub const BOOKING_CANCELLATIONS_TOPIC: &str = "booking-cancellations";

/// A paid reservation that still has to be written to the booking store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    /// Email, username or numeric id of the guest.
    pub user_id: String,
    /// The room's external `internal_id`, not its primary key.
    pub room_id: String,
    pub guests: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub booking_id: String,
    pub payment_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CancellationEvent {
    pub booking_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Anything published on one of the booking topics.
///
/// Serializes to the bare event object, so consumers only ever see the
/// `BookingEvent` or `CancellationEvent` JSON shape.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum BookingMessage {
    Booking(BookingEvent),
    Cancellation(CancellationEvent),
}

impl BookingMessage {
    /// Partition key. Both event kinds use the booking id so a cancellation
    /// lands on the same partition as the booking it refers to.
    pub fn key(&self) -> &str {
        match self {
            BookingMessage::Booking(event) => &event.booking_id,
            BookingMessage::Cancellation(event) => &event.booking_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl From<BookingEvent> for BookingMessage {
    fn from(event: BookingEvent) -> Self {
        BookingMessage::Booking(event)
    }
}

impl From<CancellationEvent> for BookingMessage {
    fn from(event: CancellationEvent) -> Self {
        BookingMessage::Cancellation(event)
    }
}
