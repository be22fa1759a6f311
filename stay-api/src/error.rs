use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stay_booking::{BookingError, CancellationError, FailureClass};

/// Everything a handler can fail with. Only the `Display` text reaches the
/// caller; causes stay in the logs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request body")]
    MalformedBody(#[from] JsonRejection),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Cancellation(#[from] CancellationError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        let class = match self {
            ApiError::MalformedBody(_) => FailureClass::Client,
            ApiError::Booking(e) => e.class(),
            ApiError::Cancellation(e) => e.class(),
        };
        match class {
            FailureClass::Client => StatusCode::BAD_REQUEST,
            FailureClass::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            FailureClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::MalformedBody(rejection) => {
                tracing::warn!(error = %rejection.body_text(), "Rejected request body");
            }
            _ if status.is_server_error() => {
                tracing::error!(error = ?self, "Request failed");
            }
            _ => {}
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stay_core::CoreError;

    #[test]
    fn test_failure_classes_map_to_status() {
        let cases = [
            (ApiError::from(BookingError::InvalidRequest("Invalid booking dates".into())), 400),
            (ApiError::from(BookingError::ValidationRejected { reasons: vec!["Room full".into()] }), 400),
            (ApiError::from(BookingError::PaymentDeclined("Card declined".into())), 402),
            (
                ApiError::from(BookingError::PaymentUnavailable(CoreError::Unavailable {
                    service: "payment",
                    reason: "connection refused".into(),
                })),
                402,
            ),
            (
                ApiError::from(BookingError::ValidationUnavailable(CoreError::Unavailable {
                    service: "booking-management",
                    reason: "timeout".into(),
                })),
                500,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status().as_u16(), expected, "{error}");
        }
    }

    #[test]
    fn test_internal_detail_is_not_displayed() {
        let error = ApiError::from(BookingError::ValidationUnavailable(CoreError::Unavailable {
            service: "booking-management",
            reason: "dial tcp 10.0.0.7:8080: connection refused".into(),
        }));
        assert_eq!(error.to_string(), "Booking validation failed");
    }
}
