use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, PaymentStatus};
use crate::entities::car::{self, FuelType, StringList, Transmission};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::handlers::IdPath;
use crate::services::booking::{BookingUpdate, BookingView};
use crate::utils::upload::{self, PendingImage, MAX_IMAGES};
use crate::AppState;

// ============ Booking Management ============

/// List all bookings (admin)
pub async fn list_bookings(State(state): State<AppState>) -> AppResult<Json<Vec<BookingView>>> {
    Ok(Json(state.bookings.list_all().await?))
}

/// Update booking status and/or payment status (admin)
pub async fn update_booking(
    State(state): State<AppState>,
    IdPath(booking_id): IdPath<Uuid>,
    Json(payload): Json<BookingUpdate>,
) -> AppResult<Json<BookingView>> {
    Ok(Json(state.bookings.update_status(booking_id, payload).await?))
}

// ============ Dashboard ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_cars: u64,
    pub available_cars: u64,
    pub total_users: u64,
    pub total_bookings: u64,
    pub active_bookings: u64,
    pub total_revenue: f64,
}

/// Aggregate dashboard numbers (admin)
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let total_cars = car::Entity::find().count(&state.db).await?;
    let available_cars = car::Entity::find()
        .filter(car::Column::IsAvailable.eq(true))
        .count(&state.db)
        .await?;
    let total_users = user::Entity::find()
        .filter(user::Column::Role.ne(UserRole::Admin))
        .count(&state.db)
        .await?;
    let total_bookings = booking::Entity::find().count(&state.db).await?;
    let active_bookings = booking::Entity::find()
        .filter(booking::Column::Status.eq(BookingStatus::Active))
        .count(&state.db)
        .await?;

    let total_revenue = booking::Entity::find()
        .select_only()
        .column_as(booking::Column::TotalAmount.sum(), "total")
        .filter(booking::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .into_tuple::<Option<f64>>()
        .one(&state.db)
        .await?
        .flatten()
        .unwrap_or(0.0);

    Ok(Json(StatsResponse {
        total_cars,
        available_cars,
        total_users,
        total_bookings,
        active_bookings,
        total_revenue,
    }))
}

// ============ Car Management ============

/// Text fields and image parts of a car multipart form.
#[derive(Debug, Default)]
struct CarForm {
    fields: HashMap<String, String>,
    features: Option<Vec<String>>,
    images: Vec<PendingImage>,
}

async fn read_car_form(mut multipart: Multipart) -> AppResult<CarForm> {
    let mut form = CarForm::default();
    let read_error = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Multipart error: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "images" => {
                if form.images.len() == MAX_IMAGES {
                    return Err(AppError::Validation(format!(
                        "At most {} images can be uploaded",
                        MAX_IMAGES
                    )));
                }
                let image = PendingImage {
                    original_name: field.file_name().map(String::from),
                    content_type: field.content_type().map(String::from),
                    data: field.bytes().await.map_err(read_error)?.to_vec(),
                };
                upload::validate_image(&image)?;
                form.images.push(image);
            }
            // Either repeated parts or one comma-separated value
            "features" | "features[]" => {
                let text = field.text().await.map_err(read_error)?;
                form.features.get_or_insert_with(Vec::new).extend(
                    text.split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(String::from),
                );
            }
            _ => {
                let text = field.text().await.map_err(read_error)?;
                form.fields.insert(name, text.trim().to_string());
            }
        }
    }

    Ok(form)
}

impl CarForm {
    fn text(&self, key: &str) -> Option<String> {
        self.fields.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn parsed<T: FromStr>(&self, key: &str) -> AppResult<Option<T>> {
        self.text(key)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| AppError::Validation(format!("Invalid value for {}", key)))
            })
            .transpose()
    }

    fn fuel_type(&self) -> AppResult<Option<FuelType>> {
        self.text("fuelType")
            .map(|v| match v.as_str() {
                "Petrol" => Ok(FuelType::Petrol),
                "Diesel" => Ok(FuelType::Diesel),
                "Electric" => Ok(FuelType::Electric),
                "Hybrid" => Ok(FuelType::Hybrid),
                _ => Err(AppError::Validation(
                    "fuelType must be Petrol, Diesel, Electric or Hybrid".to_string(),
                )),
            })
            .transpose()
    }

    fn transmission(&self) -> AppResult<Option<Transmission>> {
        self.text("transmission")
            .map(|v| match v.as_str() {
                "Manual" => Ok(Transmission::Manual),
                "Automatic" => Ok(Transmission::Automatic),
                _ => Err(AppError::Validation(
                    "transmission must be Manual or Automatic".to_string(),
                )),
            })
            .transpose()
    }

    /// Parse every editable field, leaving out the ones not present.
    fn changes(&self) -> AppResult<CarChanges> {
        let changes = CarChanges {
            name: self.text("name"),
            brand: self.text("brand"),
            model: self.text("model"),
            year: self.parsed("year")?,
            color: self.text("color"),
            fuel_type: self.fuel_type()?,
            transmission: self.transmission()?,
            seats: self.parsed("seats")?,
            price_per_day: self.parsed("pricePerDay")?,
            description: self.fields.get("description").cloned(),
            features: self.features.clone(),
            location: self.text("location"),
            registration_number: self.text("registrationNumber"),
            is_available: self.parsed("isAvailable")?,
        };
        changes.validate()?;
        Ok(changes)
    }
}

/// Explicit partial update of a car's catalog fields.
#[derive(Debug, Default)]
struct CarChanges {
    name: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    year: Option<i32>,
    color: Option<String>,
    fuel_type: Option<FuelType>,
    transmission: Option<Transmission>,
    seats: Option<i32>,
    price_per_day: Option<f64>,
    description: Option<String>,
    features: Option<Vec<String>>,
    location: Option<String>,
    registration_number: Option<String>,
    is_available: Option<bool>,
}

impl CarChanges {
    fn validate(&self) -> AppResult<()> {
        if let Some(seats) = self.seats {
            if !(2..=8).contains(&seats) {
                return Err(AppError::Validation("seats must be between 2 and 8".to_string()));
            }
        }
        if let Some(price) = self.price_per_day {
            if !price.is_finite() || price <= 0.0 {
                return Err(AppError::Validation("pricePerDay must be positive".to_string()));
            }
        }
        if let Some(year) = self.year {
            let latest = Utc::now().year() + 1;
            if !(1900..=latest).contains(&year) {
                return Err(AppError::Validation(format!(
                    "year must be between 1900 and {}",
                    latest
                )));
            }
        }
        Ok(())
    }
}

async fn registration_taken(
    state: &AppState,
    registration_number: &str,
    except: Option<Uuid>,
) -> AppResult<bool> {
    let mut query = car::Entity::find()
        .filter(car::Column::RegistrationNumber.eq(registration_number));
    if let Some(id) = except {
        query = query.filter(car::Column::Id.ne(id));
    }
    Ok(query.count(&state.db).await? > 0)
}

const DUPLICATE_REGISTRATION: &str = "Car with this registration number already exists";

/// Add a car with up to five images (admin)
pub async fn create_car(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<car::Model>)> {
    let form = read_car_form(multipart).await?;
    let changes = form.changes()?;

    let missing = || AppError::Validation("All required fields must be filled".to_string());
    let registration_number = changes.registration_number.ok_or_else(missing)?;
    let mut new_car = car::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(changes.name.ok_or_else(missing)?),
        brand: Set(changes.brand.ok_or_else(missing)?),
        model: Set(changes.model.ok_or_else(missing)?),
        year: Set(changes.year.ok_or_else(missing)?),
        color: Set(changes.color.ok_or_else(missing)?),
        fuel_type: Set(changes.fuel_type.ok_or_else(missing)?),
        transmission: Set(changes.transmission.ok_or_else(missing)?),
        seats: Set(changes.seats.ok_or_else(missing)?),
        price_per_day: Set(changes.price_per_day.ok_or_else(missing)?),
        description: Set(changes.description.filter(|d| !d.is_empty())),
        features: Set(StringList(changes.features.unwrap_or_default())),
        images: Set(StringList::default()),
        is_available: Set(changes.is_available.unwrap_or(true)),
        location: Set(changes.location.ok_or_else(missing)?),
        registration_number: Set(registration_number.clone()),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    };

    if registration_taken(&state, &registration_number, None).await? {
        return Err(AppError::Conflict(DUPLICATE_REGISTRATION.to_string()));
    }

    new_car.images = Set(StringList(
        upload::store_images(&state.config.upload_dir, form.images).await?,
    ));

    let car = new_car
        .insert(&state.db)
        .await
        .map_err(|e| AppError::unique_violation(e, DUPLICATE_REGISTRATION))?;

    tracing::info!(car_id = %car.id, registration = %car.registration_number, "Car added");

    Ok((StatusCode::CREATED, Json(car)))
}

/// Update a car; new images are appended (admin)
pub async fn update_car(
    State(state): State<AppState>,
    IdPath(car_id): IdPath<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<car::Model>> {
    let form = read_car_form(multipart).await?;
    let changes = form.changes()?;

    let car = car::Entity::find_by_id(car_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    if let Some(registration_number) = &changes.registration_number {
        if registration_taken(&state, registration_number, Some(car.id)).await? {
            return Err(AppError::Conflict(DUPLICATE_REGISTRATION.to_string()));
        }
    }

    let mut images = car.images.0.clone();
    let mut active = car.into_active_model();

    if let Some(v) = changes.name {
        active.name = Set(v);
    }
    if let Some(v) = changes.brand {
        active.brand = Set(v);
    }
    if let Some(v) = changes.model {
        active.model = Set(v);
    }
    if let Some(v) = changes.year {
        active.year = Set(v);
    }
    if let Some(v) = changes.color {
        active.color = Set(v);
    }
    if let Some(v) = changes.fuel_type {
        active.fuel_type = Set(v);
    }
    if let Some(v) = changes.transmission {
        active.transmission = Set(v);
    }
    if let Some(v) = changes.seats {
        active.seats = Set(v);
    }
    if let Some(v) = changes.price_per_day {
        active.price_per_day = Set(v);
    }
    if let Some(v) = changes.description {
        active.description = Set(Some(v).filter(|d| !d.is_empty()));
    }
    if let Some(v) = changes.features {
        active.features = Set(StringList(v));
    }
    if let Some(v) = changes.location {
        active.location = Set(v);
    }
    if let Some(v) = changes.registration_number {
        active.registration_number = Set(v);
    }
    if let Some(v) = changes.is_available {
        active.is_available = Set(v);
    }

    if !form.images.is_empty() {
        images.extend(upload::store_images(&state.config.upload_dir, form.images).await?);
        active.images = Set(StringList(images));
    }
    active.updated_at = Set(Utc::now().into());

    let car = active
        .update(&state.db)
        .await
        .map_err(|e| AppError::unique_violation(e, DUPLICATE_REGISTRATION))?;

    tracing::info!(car_id = %car.id, "Car updated");

    Ok(Json(car))
}

/// Delete a car unless bookings still hold it (admin)
pub async fn delete_car(
    State(state): State<AppState>,
    IdPath(car_id): IdPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let txn = state.db.begin().await?;

    // Lock the car so no booking can be created for it while we check
    let car = car::Entity::find_by_id(car_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    let holding = booking::Entity::find()
        .filter(booking::Column::CarId.eq(car.id))
        .filter(booking::Column::Status.is_in(BookingStatus::HOLDING))
        .count(&txn)
        .await?;

    if holding > 0 {
        return Err(AppError::Conflict(
            "Cannot delete car with active bookings".to_string(),
        ));
    }

    car::Entity::delete_by_id(car.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(car_id = %car.id, "Car deleted");

    Ok(Json(serde_json::json!({ "success": true, "message": "Car deleted successfully" })))
}
