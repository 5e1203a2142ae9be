pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::booking::BookingService;
use services::payment::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub bookings: BookingService,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, payments: Arc<dyn PaymentGateway>) -> Self {
        Self {
            bookings: BookingService::new(db.clone()),
            db,
            config,
            payments,
        }
    }
}
