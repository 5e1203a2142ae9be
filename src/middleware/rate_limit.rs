use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Per-IP request budget: one token every `REFILL_MS`, bursting up to `BURST`.
pub const REFILL_MS: u64 = 60;
pub const BURST: u32 = 1000;

/// Access log keyed by client address. Sits inside the governor layer, so
/// throttled requests surface here as 429s.
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!(client_ip = %addr.ip(), %method, %path, "Rate limit exceeded");
        }
        s if s.is_server_error() => {
            tracing::error!(client_ip = %addr.ip(), %method, %path, status = s.as_u16(), elapsed_ms, "Request errored");
        }
        s if s.is_client_error() => {
            tracing::info!(client_ip = %addr.ip(), %method, %path, status = s.as_u16(), elapsed_ms, "Request rejected");
        }
        s => {
            tracing::debug!(client_ip = %addr.ip(), %method, %path, status = s.as_u16(), elapsed_ms, "Request served");
        }
    }

    response
}
