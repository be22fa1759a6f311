use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use stay_booking::{BookingRequest, BookingResponse, CancellationRequest, CancellationResponse};

use crate::baggage::RequestBaggage;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/book", post(book))
        .route("/cancel", post(cancel))
}

async fn book(
    State(state): State<AppState>,
    RequestBaggage(baggage): RequestBaggage,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let Json(request) = payload?;
    let booking_id = state.orchestrator.book(request, &baggage).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::booked(booking_id))))
}

async fn cancel(
    State(state): State<AppState>,
    RequestBaggage(baggage): RequestBaggage,
    payload: Result<Json<CancellationRequest>, JsonRejection>,
) -> Result<Json<CancellationResponse>, ApiError> {
    let Json(request) = payload?;
    state.orchestrator.cancel(request, &baggage).await?;
    Ok(Json(CancellationResponse::cancelled()))
}
