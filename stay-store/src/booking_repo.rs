use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stay_core::repository::{
    user_lookups, BookingRecord, BookingSink, BookingStatus, CancellationSink, RepositoryError,
    UserLookup,
};
use stay_shared::{Baggage, BookingEvent, CancellationEvent};
use tracing::{info, warn};

/// Fulfillment writer backed by the booking-management database.
///
/// Identifier resolution and the insert are separate statements; nothing
/// here re-checks availability, which the directory service already did.
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_ref: Option<String>,
    user_id: i32,
    room_id: i32,
    number_of_guests: i32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    payment_id: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn storage(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(Box::new(e))
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lookup_user(&self, lookup: UserLookup<'_>) -> Result<Option<i32>, sqlx::Error> {
        let query = match lookup {
            UserLookup::Email(email) => {
                sqlx::query_scalar("SELECT id FROM users WHERE email = $1").bind(email)
            }
            UserLookup::Username(username) => {
                sqlx::query_scalar("SELECT id FROM users WHERE username = $1").bind(username)
            }
            UserLookup::Id(id) => sqlx::query_scalar("SELECT id FROM users WHERE id = $1").bind(id),
        };
        query.fetch_optional(&self.pool).await
    }

    async fn resolve_user(&self, identifier: &str) -> Result<i32, RepositoryError> {
        for lookup in user_lookups(identifier) {
            if let Some(id) = self.lookup_user(lookup).await.map_err(storage)? {
                return Ok(id);
            }
        }
        Err(RepositoryError::UserNotFound(identifier.to_string()))
    }

    async fn resolve_room(&self, internal_id: &str) -> Result<i32, RepositoryError> {
        sqlx::query_scalar("SELECT id FROM rooms WHERE internal_id = $1")
            .bind(internal_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or_else(|| RepositoryError::RoomNotFound(internal_id.to_string()))
    }

    pub async fn find_booking(&self, booking_ref: &str) -> Result<Option<BookingRecord>, RepositoryError> {
        let row: Option<BookingRow> = sqlx::query_as(
            r#"
            SELECT booking_ref, user_id, room_id, number_of_guests, start_date, end_date,
                   payment_id, status, created_at, updated_at
            FROM bookings WHERE booking_ref = $1
            "#,
        )
        .bind(booking_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(|row| {
            let status = BookingStatus::parse(&row.status).ok_or_else(|| {
                RepositoryError::InvalidEvent(format!("unknown booking status {}", row.status))
            })?;
            Ok(BookingRecord {
                booking_ref: row.booking_ref.unwrap_or_default(),
                user_id: row.user_id,
                room_id: row.room_id,
                number_of_guests: row.number_of_guests,
                start_date: row.start_date,
                end_date: row.end_date,
                payment_id: row.payment_id,
                status,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl BookingSink for PgBookingRepository {
    async fn create_booking(
        &self,
        event: &BookingEvent,
        _baggage: &Baggage,
    ) -> Result<(), RepositoryError> {
        let user_id = self.resolve_user(&event.user_id).await?;
        let room_id = self.resolve_room(&event.room_id).await?;
        let guests = i32::try_from(event.guests)
            .map_err(|_| RepositoryError::InvalidEvent(format!("guest count {}", event.guests)))?;
        let payment_id = Some(event.payment_id.as_str()).filter(|p| !p.is_empty());
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO bookings (booking_ref, user_id, room_id, number_of_guests, start_date, end_date, payment_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (booking_ref) DO NOTHING
            "#,
        )
        .bind(&event.booking_id)
        .bind(user_id)
        .bind(room_id)
        .bind(guests)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(payment_id)
        .bind(BookingStatus::Accepted.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            warn!(booking_id = %event.booking_id, "Booking already stored, ignoring redelivery");
        } else {
            info!(booking_id = %event.booking_id, user_id, room_id, "Booking stored");
        }
        Ok(())
    }
}

#[async_trait]
impl CancellationSink for PgBookingRepository {
    async fn cancel_booking(
        &self,
        event: &CancellationEvent,
        _baggage: &Baggage,
    ) -> Result<(), RepositoryError> {
        let cancelled = BookingStatus::Cancelled.as_str();
        let result = sqlx::query(
            "UPDATE bookings SET status = $1, updated_at = $2 WHERE booking_ref = $3 AND status <> $1",
        )
        .bind(cancelled)
        .bind(Utc::now())
        .bind(&event.booking_id)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() > 0 {
            info!(booking_id = %event.booking_id, "Booking cancelled");
            return Ok(());
        }

        // Nothing updated: either already cancelled, or not written yet.
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM bookings WHERE booking_ref = $1")
            .bind(&event.booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match status {
            Some(_) => {
                info!(booking_id = %event.booking_id, "Booking already cancelled");
                Ok(())
            }
            None => Err(RepositoryError::BookingNotFound(event.booking_id.clone())),
        }
    }
}
