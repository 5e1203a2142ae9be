pub mod admin;
pub mod auth;
pub mod bookings;
pub mod cars;
pub mod payment;

use axum::extract::FromRequestParts;

use crate::error::AppError;

/// `Path` whose rejection is reported as an `AppError::Validation` body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct IdPath<T>(pub T);
