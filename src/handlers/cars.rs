use axum::{
    extract::{Query, State},
    Json,
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::car::{self, FuelType, Transmission};
use crate::error::{AppError, AppResult};
use crate::handlers::IdPath;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarFilter {
    pub brand: Option<String>,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub available: Option<bool>,
}

/// List cars, newest first
pub async fn list_cars(
    State(state): State<AppState>,
    Query(filter): Query<CarFilter>,
) -> AppResult<Json<Vec<car::Model>>> {
    let mut query = car::Entity::find();

    if filter.available == Some(true) {
        query = query.filter(car::Column::IsAvailable.eq(true));
    }
    if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        // Case-insensitive substring match
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(car::Column::Brand)))
                .like(format!("%{}%", brand.to_lowercase())),
        );
    }
    if let Some(fuel_type) = filter.fuel_type {
        query = query.filter(car::Column::FuelType.eq(fuel_type));
    }
    if let Some(transmission) = filter.transmission {
        query = query.filter(car::Column::Transmission.eq(transmission));
    }
    if let Some(min) = filter.min_price {
        query = query.filter(car::Column::PricePerDay.gte(min));
    }
    if let Some(max) = filter.max_price {
        query = query.filter(car::Column::PricePerDay.lte(max));
    }

    let cars = query
        .order_by_desc(car::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(cars))
}

/// Get car details
pub async fn get_car(
    State(state): State<AppState>,
    IdPath(car_id): IdPath<Uuid>,
) -> AppResult<Json<car::Model>> {
    let car = car::Entity::find_by_id(car_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    Ok(Json(car))
}
