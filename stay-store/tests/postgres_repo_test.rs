//! Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`

use chrono::{Duration, Utc};
use stay_core::repository::{BookingSink, BookingStatus, CancellationSink, RepositoryError};
use stay_shared::{Baggage, BookingEvent, CancellationEvent};
use stay_store::app_config::DatabaseConfig;
use stay_store::{DbClient, PgBookingRepository};

struct Fixture {
    repo: PgBookingRepository,
    suffix: String,
    user_id: i32,
}

async fn setup() -> Fixture {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = DbClient::new(&DatabaseConfig { url, max_connections: 2 }).await.unwrap();
    db.migrate().await.unwrap();

    let suffix = Utc::now().timestamp_nanos_opt().unwrap().to_string();
    let user_id: i32 = sqlx::query_scalar("INSERT INTO users (username, email) VALUES ($1, $2) RETURNING id")
        .bind(format!("user-{suffix}"))
        .bind(format!("user-{suffix}@example.com"))
        .fetch_one(&db.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO rooms (internal_id, name, capacity) VALUES ($1, 'Test room', 4)")
        .bind(format!("ROOM-{suffix}"))
        .execute(&db.pool)
        .await
        .unwrap();

    Fixture {
        repo: PgBookingRepository::new(db.pool.clone()),
        suffix,
        user_id,
    }
}

fn event(f: &Fixture, user: String) -> BookingEvent {
    let start = Utc::now() + Duration::days(30);
    BookingEvent {
        user_id: user,
        room_id: format!("ROOM-{}", f.suffix),
        guests: 2,
        start_date: start,
        end_date: start + Duration::days(3),
        booking_id: format!("booking_{}_pgtest", f.suffix),
        payment_id: "pay_pg".into(),
    }
}

#[tokio::test]
#[ignore]
async fn test_booking_lifecycle_against_postgres() {
    let f = setup().await;
    let booking = event(&f, format!("user-{}@example.com", f.suffix));

    f.repo.create_booking(&booking, &Baggage::empty()).await.unwrap();
    // redelivery is a no-op
    f.repo.create_booking(&booking, &Baggage::empty()).await.unwrap();

    let stored = f.repo.find_booking(&booking.booking_id).await.unwrap().unwrap();
    assert_eq!(stored.user_id, f.user_id);
    assert_eq!(stored.status, BookingStatus::Accepted);
    assert_eq!(stored.payment_id.as_deref(), Some("pay_pg"));

    let cancel = CancellationEvent {
        booking_id: booking.booking_id.clone(),
        user_id: booking.user_id.clone(),
        timestamp: Utc::now(),
    };
    f.repo.cancel_booking(&cancel, &Baggage::empty()).await.unwrap();
    f.repo.cancel_booking(&cancel, &Baggage::empty()).await.unwrap();

    let stored = f.repo.find_booking(&booking.booking_id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
}

#[tokio::test]
#[ignore]
async fn test_user_resolved_by_username_and_id() {
    let f = setup().await;

    let mut by_name = event(&f, format!("user-{}", f.suffix));
    by_name.booking_id.push_str("_name");
    f.repo.create_booking(&by_name, &Baggage::empty()).await.unwrap();

    let mut by_id = event(&f, f.user_id.to_string());
    by_id.booking_id.push_str("_id");
    f.repo.create_booking(&by_id, &Baggage::empty()).await.unwrap();

    for id in [&by_name.booking_id, &by_id.booking_id] {
        assert_eq!(f.repo.find_booking(id).await.unwrap().unwrap().user_id, f.user_id);
    }
}

#[tokio::test]
#[ignore]
async fn test_missing_rows_are_errors() {
    let f = setup().await;

    let err = f
        .repo
        .create_booking(&event(&f, "nobody-at-all".into()), &Baggage::empty())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UserNotFound(_)));

    let cancel = CancellationEvent {
        booking_id: format!("booking_{}_missing", f.suffix),
        user_id: "nobody".into(),
        timestamp: Utc::now(),
    };
    let err = f.repo.cancel_booking(&cancel, &Baggage::empty()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::BookingNotFound(_)));
}
