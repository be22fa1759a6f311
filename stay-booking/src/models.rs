use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stay_core::publisher::PublishError;
use stay_core::CoreError;
use stay_shared::CardNumber;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub credit_card_number: CardNumber,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub guests: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub booking_id: Option<String>,
}

impl BookingResponse {
    pub fn booked(booking_id: String) -> Self {
        Self {
            success: true,
            message: "Booking completed successfully".to_string(),
            booking_id: Some(booking_id),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            booking_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequest {
    #[serde(default)]
    pub booking_id: String,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancellationResponse {
    pub success: bool,
    pub message: String,
}

impl CancellationResponse {
    pub fn cancelled() -> Self {
        Self {
            success: true,
            message: "Booking cancellation completed successfully".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// ============================================================================
// Failure classification
// ============================================================================

/// Who is at fault, and what the caller should do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Bad input or a rejected business rule; retrying the same request won't help.
    Client,
    /// Nothing was charged; retry the whole booking.
    PaymentRequired,
    /// Temporary system issue.
    Server,
}

/// Why a booking was not accepted. `Display` is safe to show to callers; the
/// underlying cause is only reachable through `source()` for logging.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Booking validation failed: {}", .reasons.join("; "))]
    ValidationRejected { reasons: Vec<String> },

    #[error("Booking validation failed")]
    ValidationUnavailable(#[source] CoreError),

    #[error("Payment processing failed")]
    PaymentUnavailable(#[source] CoreError),

    #[error("Payment failed: {0}")]
    PaymentDeclined(String),

    /// The card has been charged but no booking event exists.
    #[error("Booking event publishing failed")]
    PublishFailed {
        payment_id: String,
        #[source]
        source: PublishError,
    },
}

impl BookingError {
    pub fn class(&self) -> FailureClass {
        match self {
            BookingError::InvalidRequest(_) | BookingError::ValidationRejected { .. } => {
                FailureClass::Client
            }
            BookingError::PaymentUnavailable(_) | BookingError::PaymentDeclined(_) => {
                FailureClass::PaymentRequired
            }
            BookingError::ValidationUnavailable(_) | BookingError::PublishFailed { .. } => {
                FailureClass::Server
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CancellationError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Cancellation event publishing failed")]
    PublishFailed(#[source] PublishError),
}

impl CancellationError {
    pub fn class(&self) -> FailureClass {
        match self {
            CancellationError::InvalidRequest(_) => FailureClass::Client,
            CancellationError::PublishFailed(_) => FailureClass::Server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_request_wire_names() {
        let req: BookingRequest = serde_json::from_str(
            r#"{
                "paymentId": "pay_1",
                "creditCardNumber": "4111111111111111",
                "roomId": "ROOM-1",
                "userId": "alice",
                "guests": 2,
                "startDate": "2030-01-01T00:00:00Z",
                "endDate": "2030-01-03T00:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(req.payment_id, "pay_1");
        assert_eq!(req.credit_card_number.expose(), "4111111111111111");
        assert_eq!(req.guests, 2);
        assert!(!format!("{:?}", req).contains("4111111111111111"));
    }

    #[test]
    fn test_booking_id_is_omitted_on_failure() {
        let body = serde_json::to_value(BookingResponse::failed("nope")).unwrap();
        assert!(body.get("bookingId").is_none());

        let body = serde_json::to_value(BookingResponse::booked("booking_1_abcdef".into())).unwrap();
        assert_eq!(body["bookingId"], "booking_1_abcdef");
    }

    #[test]
    fn test_rejection_message_lists_reasons() {
        let err = BookingError::ValidationRejected {
            reasons: vec!["Room does not exist".into(), "Too many guests".into()],
        };
        assert_eq!(
            err.to_string(),
            "Booking validation failed: Room does not exist; Too many guests"
        );
        assert_eq!(err.class(), FailureClass::Client);
    }

    #[test]
    fn test_internal_detail_stays_out_of_display() {
        let err = BookingError::ValidationUnavailable(CoreError::Unavailable {
            service: "booking-management",
            reason: "connection refused (10.0.0.3:8080)".into(),
        });
        assert_eq!(err.to_string(), "Booking validation failed");
        assert_eq!(err.class(), FailureClass::Server);
    }
}
