use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use stay_core::repository::{
    user_lookups, BookingRecord, BookingSink, BookingStatus, CancellationSink, RepositoryError,
    UserLookup,
};
use stay_shared::{Baggage, BookingEvent, CancellationEvent};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<UserRow>,
    rooms: HashMap<String, i32>,
    bookings: HashMap<String, BookingRecord>,
    next_room_id: i32,
}

/// In-process booking store with the same resolution and status rules as
/// [`crate::PgBookingRepository`].
#[derive(Default)]
pub struct MemoryBookingRepository {
    state: RwLock<MemoryState>,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, id: i32, username: &str, email: &str) {
        self.state.write().await.users.push(UserRow {
            id,
            username: username.to_string(),
            email: email.to_string(),
        });
    }

    /// Register a room under its external id, returning its internal key.
    pub async fn add_room(&self, internal_id: &str) -> i32 {
        let mut state = self.state.write().await;
        state.next_room_id += 1;
        let id = state.next_room_id;
        state.rooms.insert(internal_id.to_string(), id);
        id
    }

    pub async fn booking(&self, booking_ref: &str) -> Option<BookingRecord> {
        self.state.read().await.bookings.get(booking_ref).cloned()
    }

    pub async fn booking_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }

    fn resolve_user(state: &MemoryState, identifier: &str) -> Result<i32, RepositoryError> {
        user_lookups(identifier)
            .into_iter()
            .find_map(|lookup| {
                state.users.iter().find(|u| match lookup {
                    UserLookup::Email(email) => u.email == email,
                    UserLookup::Username(name) => u.username == name,
                    UserLookup::Id(id) => u.id == id,
                })
            })
            .map(|u| u.id)
            .ok_or_else(|| RepositoryError::UserNotFound(identifier.to_string()))
    }
}

#[async_trait]
impl BookingSink for MemoryBookingRepository {
    async fn create_booking(
        &self,
        event: &BookingEvent,
        _baggage: &Baggage,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;

        let user_id = Self::resolve_user(&state, &event.user_id)?;
        let room_id = *state
            .rooms
            .get(&event.room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(event.room_id.clone()))?;
        let number_of_guests = i32::try_from(event.guests)
            .map_err(|_| RepositoryError::InvalidEvent(format!("guest count {}", event.guests)))?;

        let now = Utc::now();
        state
            .bookings
            .entry(event.booking_id.clone())
            .or_insert_with(|| BookingRecord {
                booking_ref: event.booking_id.clone(),
                user_id,
                room_id,
                number_of_guests,
                start_date: event.start_date,
                end_date: event.end_date,
                payment_id: Some(event.payment_id.clone()).filter(|p| !p.is_empty()),
                status: BookingStatus::Accepted,
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }
}

#[async_trait]
impl CancellationSink for MemoryBookingRepository {
    async fn cancel_booking(
        &self,
        event: &CancellationEvent,
        _baggage: &Baggage,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .get_mut(&event.booking_id)
            .ok_or_else(|| RepositoryError::BookingNotFound(event.booking_id.clone()))?;

        if booking.status != BookingStatus::Cancelled {
            booking.status = BookingStatus::Cancelled;
            booking.updated_at = Utc::now();
        }
        Ok(())
    }
}
