use axum::{extract::State, Extension, Json};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentStatus};
use crate::entities::car;
use crate::error::{AppError, AppResult};
use crate::services::booking::PaymentOutcome;
use crate::services::payment::{CheckoutSession, SessionStatus};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub booking_id: Option<Uuid>,
    pub session_id: Option<String>,
    /// Only honoured for direct (mock) confirmations; defaults to paid.
    pub outcome: Option<PaymentOutcome>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    pub message: String,
}

fn ensure_owner(booking: &booking::Model, claims: &Claims) -> AppResult<()> {
    if booking.user_id != claims.sub && !claims.is_admin() {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    Ok(())
}

/// Start a gateway checkout for one of the caller's bookings
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutSession>> {
    let booking = state.bookings.find(payload.booking_id).await?;
    ensure_owner(&booking, &claims)?;

    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::InvalidState(
            "Cannot pay for a cancelled booking".to_string(),
        ));
    }
    if booking.payment_status == PaymentStatus::Paid {
        return Err(AppError::InvalidState("Booking is already paid".to_string()));
    }

    let description = car::Entity::find_by_id(booking.car_id)
        .one(&state.db)
        .await?
        .map(|c| format!("{} rental, {} days", c.name, booking.total_days))
        .unwrap_or_else(|| format!("Car rental, {} days", booking.total_days));

    let session = state.payments.create_checkout(&booking, &description).await?;
    tracing::info!(booking_id = %booking.id, session_id = %session.id, "Checkout session created");

    Ok(Json(session))
}

/// Record a payment result reported by the gateway
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<ConfirmPaymentResponse>> {
    let (booking_id, outcome) = match (payload.session_id, payload.booking_id) {
        (Some(session_id), _) => {
            let verification = state.payments.verify_session(&session_id).await?;
            let outcome = match verification.status {
                SessionStatus::Paid => PaymentOutcome::Paid,
                SessionStatus::Failed => PaymentOutcome::Failed,
                SessionStatus::Open => {
                    return Ok(Json(ConfirmPaymentResponse {
                        success: false,
                        message: "Payment has not been completed".to_string(),
                    }));
                }
            };
            (verification.booking_id, outcome)
        }
        (None, Some(booking_id)) => {
            if !state.payments.allows_direct_confirmation() {
                return Err(AppError::Validation("sessionId is required".to_string()));
            }
            (booking_id, payload.outcome.unwrap_or(PaymentOutcome::Paid))
        }
        (None, None) => {
            return Err(AppError::Validation(
                "bookingId or sessionId is required".to_string(),
            ));
        }
    };

    let booking = state.bookings.find(booking_id).await?;
    ensure_owner(&booking, &claims)?;

    state.bookings.record_payment(booking.id, outcome).await?;

    let response = match outcome {
        PaymentOutcome::Paid => ConfirmPaymentResponse {
            success: true,
            message: "Payment confirmed".to_string(),
        },
        PaymentOutcome::Failed => ConfirmPaymentResponse {
            success: false,
            message: "Payment failed".to_string(),
        },
    };

    Ok(Json(response))
}
