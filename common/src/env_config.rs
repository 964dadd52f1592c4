use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// Holds everything required to initialize and run the service:
/// database connection, identity provider access, payment gateway
/// credentials and the polling parameters of the upgrade watcher.
pub struct Config {
    pub environment: String,
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub num_workers: usize,
    pub cors_allowed_origin: String,
    pub console_logging_enabled: bool,
    pub identity_service_url: String,
    pub identity_api_key: String,
    pub razorpay: RazorpayConfig,
    pub payment: PaymentConfig,
    pub poll: PollConfig,
}

#[derive(Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    /// Amount in minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub description: String,
}

#[derive(Clone, Debug)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Arc<Config> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            identity_service_url: env::var("IDENTITY_SERVICE_URL")
                .expect("IDENTITY_SERVICE_URL must be set"),
            identity_api_key: env::var("IDENTITY_API_KEY")
                .expect("IDENTITY_API_KEY must be set"),
            razorpay: RazorpayConfig {
                key_id: env::var("RAZORPAY_KEY_ID").expect("RAZORPAY_KEY_ID must be set"),
                key_secret: env::var("RAZORPAY_KEY_SECRET")
                    .expect("RAZORPAY_KEY_SECRET must be set"),
                webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET")
                    .expect("RAZORPAY_WEBHOOK_SECRET must be set"),
            },
            payment: PaymentConfig {
                amount: env::var("PAYMENT_AMOUNT")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .unwrap_or(10000),
                currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
                description: env::var("PAYMENT_DESCRIPTION")
                    .unwrap_or_else(|_| "Premium subscription (30 days)".to_string()),
            },
            poll: PollConfig {
                interval_ms: env::var("POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .unwrap_or(500),
                timeout_secs: env::var("POLL_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .unwrap_or(120),
            },
        })
    }
}
