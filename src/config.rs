use std::env;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentProvider {
    Mock,
    Stripe,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: String,
    pub frontend_url: String,
    pub payment_provider: PaymentProvider,
    pub stripe_secret_key: Option<String>,
    pub payment_currency: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let payment_provider = match env::var("PAYMENT_PROVIDER")
            .unwrap_or_else(|_| "mock".to_string())
            .to_lowercase()
            .as_str()
        {
            "stripe" => PaymentProvider::Stripe,
            "mock" => PaymentProvider::Mock,
            other => panic!("PAYMENT_PROVIDER must be 'mock' or 'stripe', got '{}'", other),
        };

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").ok();
        if payment_provider == PaymentProvider::Stripe && stripe_secret_key.is_none() {
            panic!("STRIPE_SECRET_KEY must be set when PAYMENT_PROVIDER=stripe");
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            payment_provider,
            stripe_secret_key,
            payment_currency: env::var("PAYMENT_CURRENCY")
                .unwrap_or_else(|_| "inr".to_string()),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@carrental.com".to_string()),
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
