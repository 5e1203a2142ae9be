use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{Config, PaymentProvider};
use crate::entities::booking;
use crate::error::{AppError, AppResult};

const STRIPE_API_BASE: &str = "https://api.stripe.com";
const MOCK_SESSION_PREFIX: &str = "mock_";

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Paid,
    Failed,
    /// Customer has not finished paying yet.
    Open,
}

#[derive(Debug, Clone)]
pub struct SessionVerification {
    pub booking_id: Uuid,
    pub status: SessionStatus,
}

/// External payment provider. It only reports outcomes; recording them on the
/// booking is up to the booking service.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(
        &self,
        booking: &booking::Model,
        description: &str,
    ) -> AppResult<CheckoutSession>;

    async fn verify_session(&self, session_id: &str) -> AppResult<SessionVerification>;

    /// Whether a bare booking id may be confirmed without a gateway session.
    fn allows_direct_confirmation(&self) -> bool {
        false
    }
}

pub fn from_config(config: &Config) -> Arc<dyn PaymentGateway> {
    match config.payment_provider {
        PaymentProvider::Mock => Arc::new(MockGateway::new(&config.frontend_url)),
        PaymentProvider::Stripe => Arc::new(StripeGateway::new(
            config.stripe_secret_key.clone().unwrap_or_default(),
            &config.payment_currency,
            &config.frontend_url,
        )),
    }
}

// ============ Mock ============

/// Simulated gateway for development: every session verifies as paid.
pub struct MockGateway {
    frontend_url: String,
}

impl MockGateway {
    pub fn new(frontend_url: &str) -> Self {
        Self {
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout(
        &self,
        booking: &booking::Model,
        _description: &str,
    ) -> AppResult<CheckoutSession> {
        let id = format!("{}{}", MOCK_SESSION_PREFIX, booking.id);
        Ok(CheckoutSession {
            url: format!("{}/mock-payment?session_id={}", self.frontend_url, id),
            id,
        })
    }

    async fn verify_session(&self, session_id: &str) -> AppResult<SessionVerification> {
        let booking_id = session_id
            .strip_prefix(MOCK_SESSION_PREFIX)
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| AppError::Validation("Unknown payment session".to_string()))?;

        Ok(SessionVerification {
            booking_id,
            status: SessionStatus::Paid,
        })
    }

    fn allows_direct_confirmation(&self) -> bool {
        true
    }
}

// ============ Stripe ============

/// Stripe Checkout over the REST API.
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    currency: String,
    frontend_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    client_reference_id: Option<String>,
    payment_status: Option<String>,
    status: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: String, currency: &str, frontend_url: &str) -> Self {
        Self::with_api_base(STRIPE_API_BASE, secret_key, currency, frontend_url)
    }

    pub fn with_api_base(api_base: &str, secret_key: String, currency: &str, frontend_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            currency: currency.to_lowercase(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Amount in the currency's minor unit, as Stripe expects.
fn minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn session_status(session: &StripeSession) -> SessionStatus {
    match (session.payment_status.as_deref(), session.status.as_deref()) {
        (Some("paid"), _) | (Some("no_payment_required"), _) => SessionStatus::Paid,
        (_, Some("expired")) => SessionStatus::Failed,
        _ => SessionStatus::Open,
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout(
        &self,
        booking: &booking::Model,
        description: &str,
    ) -> AppResult<CheckoutSession> {
        let params = vec![
            ("mode", "payment".to_string()),
            ("client_reference_id", booking.id.to_string()),
            ("metadata[booking_id]", booking.id.to_string()),
            (
                "success_url",
                format!("{}/payment-success?session_id={{CHECKOUT_SESSION_ID}}", self.frontend_url),
            ),
            ("cancel_url", format!("{}/payment-cancel", self.frontend_url)),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            ("line_items[0][price_data][product_data][name]", description.to_string()),
            (
                "line_items[0][price_data][unit_amount]",
                minor_units(booking.total_amount).to_string(),
            ),
        ];

        let session: StripeSession = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Gateway(format!("Failed to create checkout session: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid checkout session response: {}", e)))?;

        let url = session
            .url
            .ok_or_else(|| AppError::Gateway("Checkout session has no URL".to_string()))?;

        Ok(CheckoutSession { id: session.id, url })
    }

    async fn verify_session(&self, session_id: &str) -> AppResult<SessionVerification> {
        if session_id.is_empty()
            || !session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::Validation("Invalid session id".to_string()));
        }

        let session: StripeSession = self
            .client
            .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Gateway(format!("Failed to retrieve checkout session: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid checkout session response: {}", e)))?;

        let booking_id = session
            .client_reference_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| AppError::Gateway("Checkout session has no booking reference".to_string()))?;

        Ok(SessionVerification {
            booking_id,
            status: session_status(&session),
        })
    }
}
