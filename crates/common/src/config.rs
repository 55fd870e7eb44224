use serde::Deserialize;

/// Global application configuration loaded from environment variables.
///
/// Constructed once in `main` and carried inside the API state; components
/// receive it by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Days a student has to respond to a released offer (default: 7)
    pub offer_deadline_days: i64,

    /// Twilio account SID (voice + whatsapp delivery)
    pub twilio_account_sid: Option<String>,

    /// Twilio auth token
    pub twilio_auth_token: Option<String>,

    /// Twilio caller number for voice campaigns
    pub twilio_phone_number: Option<String>,

    /// Twilio sender number for whatsapp campaigns
    pub twilio_whatsapp_number: Option<String>,

    /// Public base URL Twilio uses for TwiML and status callbacks
    pub webhook_base_url: String,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,

    /// Inter-send pacing per channel, in milliseconds
    pub voice_send_delay_ms: u64,
    pub email_send_delay_ms: u64,
    pub whatsapp_send_delay_ms: u64,

    /// Pause before the single rate-limit retry (default: 2000)
    pub rate_limit_backoff_ms: u64,

    /// Capacity of the dispatch queue (default: 64)
    pub dispatch_queue_depth: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: parse_var("JWT_EXPIRY_HOURS", 24)?,
            offer_deadline_days: parse_var("OFFER_DEADLINE_DAYS", 7)?,
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok(),
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN").ok(),
            twilio_phone_number: std::env::var("TWILIO_PHONE_NUMBER").ok(),
            twilio_whatsapp_number: std::env::var("TWILIO_WHATSAPP_NUMBER").ok(),
            webhook_base_url: std::env::var("WEBHOOK_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
            voice_send_delay_ms: parse_var("VOICE_SEND_DELAY_MS", 1000)?,
            email_send_delay_ms: parse_var("EMAIL_SEND_DELAY_MS", 2000)?,
            whatsapp_send_delay_ms: parse_var("WHATSAPP_SEND_DELAY_MS", 500)?,
            rate_limit_backoff_ms: parse_var("RATE_LIMIT_BACKOFF_MS", 2000)?,
            dispatch_queue_depth: parse_var("DISPATCH_QUEUE_DEPTH", 64)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid {}", name, std::any::type_name::<T>())),
        Err(_) => Ok(default),
    }
}
