//! Booking lifecycle: creation with conflict detection, cancellation,
//! admin status changes and payment outcomes.
//!
//! Every mutation runs inside a transaction that holds a row lock on the
//! entity it guards. Creation locks the car row, so two overlapping requests
//! for the same car are serialized and the second one sees the first's booking.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentStatus};
use crate::entities::{car, user};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;

// ============ Requests ============

/// Booking request as submitted; every field is optional so that missing
/// input is reported as a validation failure rather than a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub car_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone)]
struct NewBooking {
    car_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    pickup_location: String,
    dropoff_location: String,
    special_requests: Option<String>,
}

impl CreateBookingRequest {
    fn validate(self) -> AppResult<NewBooking> {
        let missing = || AppError::Validation("All required fields must be filled".to_string());

        Ok(NewBooking {
            car_id: self.car_id.ok_or_else(missing)?,
            start_date: self.start_date.ok_or_else(missing)?,
            end_date: self.end_date.ok_or_else(missing)?,
            pickup_location: non_blank(self.pickup_location).ok_or_else(missing)?,
            dropoff_location: non_blank(self.dropoff_location).ok_or_else(missing)?,
            special_requests: non_blank(self.special_requests),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Admin partial update: exactly the two mutable booking fields.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// Result reported by a payment gateway for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Paid,
    Failed,
}

impl From<PaymentOutcome> for PaymentStatus {
    fn from(outcome: PaymentOutcome) -> Self {
        match outcome {
            PaymentOutcome::Paid => PaymentStatus::Paid,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        }
    }
}

// ============ Views ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub images: Vec<String>,
    pub price_per_day: f64,
    pub location: String,
    pub registration_number: String,
}

impl From<&car::Model> for CarSummary {
    fn from(c: &car::Model) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            brand: c.brand.clone(),
            model: c.model.clone(),
            images: c.images.0.clone(),
            price_per_day: c.price_per_day,
            location: c.location.clone(),
            registration_number: c.registration_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<&user::Model> for UserSummary {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
        }
    }
}

/// A booking with its car and user resolved for display. The car is `None`
/// once it has been deleted from the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub car: Option<CarSummary>,
    pub user: Option<UserSummary>,
}

// ============ Rules ============

/// Whole calendar days between the two dates.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Closed-interval overlap: `[a_start, a_end]` intersects `[b_start, b_end]`.
pub fn ranges_overlap(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// The one place that decides whether a booking may move to `target`.
///
/// `payment` is the payment status the booking will have once the change is
/// applied, so an admin may mark a booking paid and activate it in one update.
pub fn ensure_transition(
    current: BookingStatus,
    target: BookingStatus,
    payment: PaymentStatus,
) -> AppResult<()> {
    if current == target {
        return Ok(());
    }

    if current.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "Booking is {:?} and can no longer change status",
            current
        )));
    }

    if target != BookingStatus::Cancelled && current.next() != Some(target) {
        return Err(AppError::InvalidState(format!(
            "Cannot move booking from {:?} to {:?}",
            current, target
        )));
    }

    if target.requires_payment() && payment != PaymentStatus::Paid {
        return Err(AppError::InvalidState(format!(
            "Payment must be Paid before a booking becomes {:?}",
            target
        )));
    }

    Ok(())
}

// ============ Manager ============

#[derive(Clone)]
pub struct BookingService {
    db: DatabaseConnection,
}

impl BookingService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a pending booking for `user_id`. `today` is the caller's
    /// current date; start dates before it are rejected.
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateBookingRequest,
        today: NaiveDate,
    ) -> AppResult<BookingView> {
        let input = request.validate()?;

        let txn = self.db.begin().await?;

        let car = car::Entity::find_by_id(input.car_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

        if !car.is_available {
            return Err(AppError::Unavailable("Car is not available".to_string()));
        }

        if input.start_date < today {
            return Err(AppError::InvalidDateRange(
                "Start date cannot be in the past".to_string(),
            ));
        }

        if input.end_date <= input.start_date {
            return Err(AppError::InvalidDateRange(
                "End date must be after start date".to_string(),
            ));
        }

        let conflicts = booking::Entity::find()
            .filter(booking::Column::CarId.eq(car.id))
            .filter(booking::Column::Status.is_in(BookingStatus::HOLDING))
            .filter(booking::Column::StartDate.lte(input.end_date))
            .filter(booking::Column::EndDate.gte(input.start_date))
            .count(&txn)
            .await?;

        if conflicts > 0 {
            tracing::info!(
                car_id = %car.id,
                start = %input.start_date,
                end = %input.end_date,
                "Booking rejected: dates unavailable"
            );
            return Err(AppError::Conflict(
                "Car is already booked for the selected dates".to_string(),
            ));
        }

        let total_days = i32::try_from(rental_days(input.start_date, input.end_date))
            .map_err(|_| AppError::InvalidDateRange("Rental period is too long".to_string()))?;
        let total_amount = f64::from(total_days) * car.price_per_day;

        let now = Utc::now();
        let new_booking = booking::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            car_id: Set(car.id),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            total_days: Set(total_days),
            total_amount: Set(total_amount),
            status: Set(BookingStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            pickup_location: Set(input.pickup_location),
            dropoff_location: Set(input.dropoff_location),
            special_requests: Set(input.special_requests),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let booking = new_booking.insert(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            car_id = %booking.car_id,
            user_id = %booking.user_id,
            total_days,
            total_amount,
            "Booking created"
        );

        self.view(booking).await
    }

    /// Cancel on behalf of the owner or an admin.
    pub async fn cancel(&self, booking_id: Uuid, requester: &Claims) -> AppResult<BookingView> {
        let txn = self.db.begin().await?;

        let booking = booking::Entity::find_by_id(booking_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if booking.user_id != requester.sub && !requester.is_admin() {
            return Err(AppError::Forbidden(
                "You can only cancel your own bookings".to_string(),
            ));
        }

        match booking.status {
            BookingStatus::Cancelled => {
                return Err(AppError::InvalidState(
                    "Booking is already cancelled".to_string(),
                ));
            }
            BookingStatus::Completed => {
                return Err(AppError::InvalidState(
                    "Cannot cancel a completed booking".to_string(),
                ));
            }
            _ => {}
        }
        ensure_transition(booking.status, BookingStatus::Cancelled, booking.payment_status)?;

        let mut active = booking.into_active_model();
        active.status = Set(BookingStatus::Cancelled);
        active.updated_at = Set(Utc::now().into());
        let booking = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(booking_id = %booking.id, by = %requester.sub, "Booking cancelled");

        self.view(booking).await
    }

    /// Admin update of status and/or payment status.
    pub async fn update_status(&self, booking_id: Uuid, update: BookingUpdate) -> AppResult<BookingView> {
        if update.status.is_none() && update.payment_status.is_none() {
            return Err(AppError::Validation(
                "Provide a status or paymentStatus to update".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let booking = booking::Entity::find_by_id(booking_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let payment = update.payment_status.unwrap_or(booking.payment_status);
        if let Some(status) = update.status {
            ensure_transition(booking.status, status, payment)?;
        }

        let previous = (booking.status, booking.payment_status);
        let mut active = booking.into_active_model();
        if let Some(status) = update.status {
            active.status = Set(status);
        }
        active.payment_status = Set(payment);
        active.updated_at = Set(Utc::now().into());
        let booking = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            from_status = ?previous.0,
            to_status = ?booking.status,
            from_payment = ?previous.1,
            to_payment = ?booking.payment_status,
            "Booking updated by admin"
        );

        self.view(booking).await
    }

    /// Record a gateway payment result. Status is left for an admin to advance.
    /// Cancelled bookings take no payments, and a failure never overwrites Paid.
    pub async fn record_payment(&self, booking_id: Uuid, outcome: PaymentOutcome) -> AppResult<BookingView> {
        let txn = self.db.begin().await?;

        let booking = booking::Entity::find_by_id(booking_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::InvalidState(
                "Cannot record a payment on a cancelled booking".to_string(),
            ));
        }
        // A settled payment is only undone by an admin refund
        if outcome == PaymentOutcome::Failed && booking.payment_status == PaymentStatus::Paid {
            return Err(AppError::InvalidState("Booking is already paid".to_string()));
        }

        let mut active = booking.into_active_model();
        active.payment_status = Set(outcome.into());
        active.updated_at = Set(Utc::now().into());
        let booking = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(booking_id = %booking.id, outcome = ?outcome, "Payment recorded");

        self.view(booking).await
    }

    pub async fn find(&self, booking_id: Uuid) -> AppResult<booking::Model> {
        booking::Entity::find_by_id(booking_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<BookingView>> {
        let bookings = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await?;

        self.with_details(bookings).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<BookingView>> {
        let bookings = booking::Entity::find()
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await?;

        self.with_details(bookings).await
    }

    async fn view(&self, booking: booking::Model) -> AppResult<BookingView> {
        self.with_details(vec![booking])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Booking view missing".to_string()))
    }

    async fn with_details(&self, bookings: Vec<booking::Model>) -> AppResult<Vec<BookingView>> {
        if bookings.is_empty() {
            return Ok(Vec::new());
        }

        let car_ids: Vec<Uuid> = bookings.iter().map(|b| b.car_id).collect();
        let user_ids: Vec<Uuid> = bookings.iter().map(|b| b.user_id).collect();

        let cars: HashMap<Uuid, car::Model> = car::Entity::find()
            .filter(car::Column::Id.is_in(car_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let users: HashMap<Uuid, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|b| BookingView {
                car: cars.get(&b.car_id).map(CarSummary::from),
                user: users.get(&b.user_id).map(UserSummary::from),
                booking: b,
            })
            .collect())
    }
}
