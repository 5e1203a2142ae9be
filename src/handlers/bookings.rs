use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::IdPath;
use crate::services::booking::{BookingView, CreateBookingRequest};
use crate::utils::jwt::Claims;
use crate::AppState;

/// Create a booking for the caller
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingView>)> {
    let today = Utc::now().date_naive();
    let booking = state.bookings.create(claims.sub, payload, today).await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// List the caller's bookings
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingView>>> {
    Ok(Json(state.bookings.list_for_user(claims.sub).await?))
}

/// Cancel a booking (owner or admin)
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    IdPath(booking_id): IdPath<Uuid>,
) -> AppResult<Json<BookingView>> {
    Ok(Json(state.bookings.cancel(booking_id, &claims).await?))
}
