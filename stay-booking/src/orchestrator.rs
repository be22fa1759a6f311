use chrono::{DateTime, Utc};
use std::sync::Arc;
use stay_core::booking_id::generate_booking_id_at;
use stay_core::payment::{PaymentAdapter, PaymentRequest};
use stay_core::publisher::EventPublisher;
use stay_core::validation::{ValidationClient, ValidationRequest};
use stay_shared::models::events::{BOOKING_CANCELLATIONS_TOPIC, BOOKING_EVENTS_TOPIC};
use stay_shared::{Baggage, BookingEvent, BookingMessage, CancellationEvent};
use tracing::{error, info};

use crate::models::{BookingError, BookingRequest, CancellationError, CancellationRequest};

/// Topic names the orchestrator publishes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub bookings: String,
    pub cancellations: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            bookings: BOOKING_EVENTS_TOPIC.to_string(),
            cancellations: BOOKING_CANCELLATIONS_TOPIC.to_string(),
        }
    }
}

/// Validates a booking, charges it and hands it off for fulfillment.
///
/// Every step runs in sequence on the caller's task and the first failure
/// ends the booking. Nothing is written to the booking store here; that
/// happens asynchronously once the published event is consumed.
pub struct BookingOrchestrator {
    validation: Arc<dyn ValidationClient>,
    payment: Arc<dyn PaymentAdapter>,
    publisher: Arc<dyn EventPublisher>,
    topics: Topics,
}

impl BookingOrchestrator {
    pub fn new(
        validation: Arc<dyn ValidationClient>,
        payment: Arc<dyn PaymentAdapter>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            validation,
            payment,
            publisher,
            topics: Topics::default(),
        }
    }

    pub fn with_topics(mut self, topics: Topics) -> Self {
        self.topics = topics;
        self
    }

    /// Book a room, returning the new booking id.
    pub async fn book(
        &self,
        request: BookingRequest,
        baggage: &Baggage,
    ) -> Result<String, BookingError> {
        self.book_at(request, baggage, Utc::now()).await
    }

    async fn book_at(
        &self,
        request: BookingRequest,
        baggage: &Baggage,
        now: DateTime<Utc>,
    ) -> Result<String, BookingError> {
        info!(room_id = %request.room_id, user_id = %request.user_id, "Processing booking request");

        let guests = check_booking_request(&request, now)?;

        // 1. Availability
        let validation_request = ValidationRequest {
            room_id: request.room_id.clone(),
            number_of_guests: guests,
            start_date: request.start_date,
            end_date: request.end_date,
        };
        let verdict = self
            .validation
            .validate_booking(&validation_request, baggage)
            .await
            .map_err(|e| {
                error!(error = %e, service = e.service(), room_id = %request.room_id, "Failed to validate booking");
                BookingError::ValidationUnavailable(e)
            })?;

        if !verdict.is_valid {
            info!(room_id = %request.room_id, reasons = ?verdict.reasons, "Booking rejected by validation");
            return Err(BookingError::ValidationRejected {
                reasons: verdict.reasons,
            });
        }

        info!(room_id = %request.room_id, "Booking validation passed");

        // 2. Payment
        let payment_request = PaymentRequest {
            payment_id: request.payment_id.clone(),
            card_number: request.credit_card_number.clone(),
        };
        let receipt = self
            .payment
            .process_payment(&payment_request, baggage)
            .await
            .map_err(|e| {
                error!(error = %e, service = e.service(), payment_id = %request.payment_id, "Failed to process payment");
                BookingError::PaymentUnavailable(e)
            })?;

        if !receipt.success {
            info!(payment_id = %request.payment_id, message = %receipt.message, "Payment declined");
            return Err(BookingError::PaymentDeclined(receipt.message));
        }

        // 3. Hand off for fulfillment
        let booking_id = generate_booking_id_at(now);
        let message = BookingMessage::from(BookingEvent {
            user_id: request.user_id.clone(),
            room_id: request.room_id.clone(),
            guests,
            start_date: request.start_date,
            end_date: request.end_date,
            booking_id: booking_id.clone(),
            payment_id: request.payment_id.clone(),
        });

        if let Err(e) = self
            .publisher
            .publish(&self.topics.bookings, message.key(), &message, baggage)
            .await
        {
            error!(
                error = %e,
                booking_id = %booking_id,
                payment_id = %request.payment_id,
                charged_not_booked = true,
                "Failed to publish booking event after payment was taken"
            );
            return Err(BookingError::PublishFailed {
                payment_id: request.payment_id,
                source: e,
            });
        }

        info!(booking_id = %booking_id, user_id = %request.user_id, "Booking completed successfully");
        Ok(booking_id)
    }

    /// Request cancellation of a booking. Ownership and existence are checked
    /// by the fulfillment side, not here.
    pub async fn cancel(
        &self,
        request: CancellationRequest,
        baggage: &Baggage,
    ) -> Result<(), CancellationError> {
        info!(booking_id = %request.booking_id, "Processing booking cancellation request");

        if request.booking_id.trim().is_empty() || request.user_id.trim().is_empty() {
            return Err(CancellationError::InvalidRequest(
                "Missing required fields: bookingId and userId are required".to_string(),
            ));
        }

        let message = BookingMessage::from(CancellationEvent {
            booking_id: request.booking_id.clone(),
            user_id: request.user_id.clone(),
            timestamp: Utc::now(),
        });

        self.publisher
            .publish(&self.topics.cancellations, message.key(), &message, baggage)
            .await
            .map_err(|e| {
                error!(error = %e, booking_id = %request.booking_id, "Failed to publish cancellation event");
                CancellationError::PublishFailed(e)
            })?;

        info!(booking_id = %request.booking_id, user_id = %request.user_id, "Booking cancellation accepted");
        Ok(())
    }
}

/// Reject malformed requests before anything leaves the process. Returns the
/// guest count narrowed to the event's type.
fn check_booking_request(request: &BookingRequest, now: DateTime<Utc>) -> Result<u32, BookingError> {
    if request.payment_id.trim().is_empty()
        || request.credit_card_number.is_blank()
        || request.room_id.trim().is_empty()
        || request.user_id.trim().is_empty()
    {
        return Err(BookingError::InvalidRequest("Missing required fields".to_string()));
    }

    let guests = u32::try_from(request.guests)
        .ok()
        .filter(|g| *g > 0)
        .ok_or_else(|| BookingError::InvalidRequest("Invalid number of guests".to_string()))?;

    if request.start_date >= request.end_date || request.start_date < now {
        return Err(BookingError::InvalidRequest("Invalid booking dates".to_string()));
    }

    Ok(guests)
}
