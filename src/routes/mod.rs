use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use crate::handlers::{admin, auth, bookings, cars, payment};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::utils::upload::{MAX_IMAGES, MAX_IMAGE_BYTES, PUBLIC_PREFIX};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let public_routes = Router::new()
        .route("/cars", get(cars::list_cars))
        .route("/cars/{id}", get(cars::get_car));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/{id}", put(admin::update_booking))
        .route("/stats", get(admin::stats))
        .route("/cars", post(admin::create_car))
        .route("/cars/{id}", put(admin::update_car).delete(admin::delete_car))
        // Room for every image plus the text fields
        .layer(DefaultBodyLimit::max(MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Customer routes (requires auth)
    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/my", get(bookings::my_bookings))
        .route("/{id}/cancel", put(bookings::cancel_booking))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let payment_routes = Router::new()
        .route("/checkout", post(payment::create_checkout))
        .route("/confirm", post(payment::confirm_payment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/payment", payment_routes)
        .nest_service(
            &format!("/{}", PUBLIC_PREFIX),
            ServeDir::new(&state.config.upload_dir),
        )
        .with_state(state)
}
