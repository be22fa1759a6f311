use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use stay_shared::{Baggage, BookingEvent, CancellationEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Accepted,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Accepted => "Accepted",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Accepted" => Some(BookingStatus::Accepted),
            "Cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking row as the fulfillment writer stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRecord {
    pub booking_ref: String,
    pub user_id: i32,
    pub room_id: i32,
    pub number_of_guests: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub payment_id: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("user not found with identifier: {0}")]
    UserNotFound(String),
    #[error("room not found with internal id: {0}")]
    RoomNotFound(String),
    #[error("booking not found: {0}")]
    BookingNotFound(String),
    #[error("event cannot be stored: {0}")]
    InvalidEvent(String),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// One way an external user identifier may match a stored user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup<'a> {
    Email(&'a str),
    Username(&'a str),
    Id(i32),
}

/// Lookups to try for `identifier`, highest priority first. The first lookup
/// that matches a user wins. A numeric id is only tried when the identifier is
/// made of digits alone.
pub fn user_lookups(identifier: &str) -> Vec<UserLookup<'_>> {
    let mut lookups = vec![UserLookup::Email(identifier), UserLookup::Username(identifier)];
    if !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(id) = identifier.parse::<i32>() {
            lookups.push(UserLookup::Id(id));
        }
    }
    lookups
}

/// Turns booking events into persisted bookings.
#[async_trait]
pub trait BookingSink: Send + Sync {
    /// Any error means the event was not stored and must be redelivered.
    async fn create_booking(
        &self,
        event: &BookingEvent,
        baggage: &Baggage,
    ) -> Result<(), RepositoryError>;
}

/// Applies cancellation events to persisted bookings.
#[async_trait]
pub trait CancellationSink: Send + Sync {
    async fn cancel_booking(
        &self,
        event: &CancellationEvent,
        baggage: &Baggage,
    ) -> Result<(), RepositoryError>;
}
