#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use car_rental_backend::config::{Config, PaymentProvider};
use car_rental_backend::entities::car::{self, FuelType, StringList, Transmission};
use car_rental_backend::entities::user::{self, UserRole};
use car_rental_backend::handlers::auth::hash_password;
use car_rental_backend::services::booking::CreateBookingRequest;
use car_rental_backend::services::payment::MockGateway;
use car_rental_backend::utils::jwt::{create_token, Claims};
use car_rental_backend::AppState;

pub const JWT_SECRET: &str = "test-secret";

pub fn test_config(upload_dir: &str) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        upload_dir: upload_dir.to_string(),
        frontend_url: "http://localhost:5173".to_string(),
        payment_provider: PaymentProvider::Mock,
        stripe_secret_key: None,
        payment_currency: "inr".to_string(),
        admin_email: "admin@test.com".to_string(),
        admin_password: "admin123".to_string(),
    }
}

/// Fresh in-memory database with all migrations applied.
///
/// One pooled connection: an in-memory SQLite database lives and dies with
/// its connection, and it also means transactions run one at a time.
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn test_state() -> AppState {
    let upload_dir = std::env::temp_dir().join(format!("car-rental-test-{}", Uuid::new_v4()));
    let config = test_config(upload_dir.to_str().unwrap());
    let payments = Arc::new(MockGateway::new(&config.frontend_url));
    AppState::new(test_db().await, config, payments)
}

pub async fn create_user(db: &DatabaseConnection, email: &str, role: UserRole) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(email.split('@').next().unwrap().to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password("password123").unwrap()),
        phone: Set("555-0100".to_string()),
        address: Set(None),
        driving_license: Set(None),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_car(db: &DatabaseConnection, brand: &str, price_per_day: f64, available: bool) -> car::Model {
    let now = Utc::now();
    car::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(format!("{} Sedan", brand)),
        brand: Set(brand.to_string()),
        model: Set("S1".to_string()),
        year: Set(2022),
        color: Set("Blue".to_string()),
        fuel_type: Set(FuelType::Petrol),
        transmission: Set(Transmission::Automatic),
        seats: Set(5),
        price_per_day: Set(price_per_day),
        description: Set(None),
        features: Set(StringList(vec!["AC".to_string()])),
        images: Set(StringList::default()),
        is_available: Set(available),
        location: Set("Downtown".to_string()),
        registration_number: Set(format!("REG-{}", Uuid::new_v4().simple())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn claims_for(user: &user::Model) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role.clone(),
        exp: now + 3600,
        iat: now,
    }
}

pub fn token_for(user: &user::Model) -> String {
    create_token(user.id, &user.email, user.role.clone(), JWT_SECRET, 1).unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn booking_request(car_id: Uuid, start: NaiveDate, end: NaiveDate) -> CreateBookingRequest {
    CreateBookingRequest {
        car_id: Some(car_id),
        start_date: Some(start),
        end_date: Some(end),
        pickup_location: Some("Airport".to_string()),
        dropoff_location: Some("Downtown".to_string()),
        special_requests: None,
    }
}
