use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;
pub const DEFAULT_STORAGE_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_CONSULTATION_FEE: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub booking_max_retry_attempts: u32,
    pub booking_retry_backoff_ms: u64,
    pub storage_timeout_seconds: u64,
    pub default_consultation_fee: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            booking_max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            booking_retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            storage_timeout_seconds: DEFAULT_STORAGE_TIMEOUT_SECONDS,
            default_consultation_fee: DEFAULT_CONSULTATION_FEE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            booking_max_retry_attempts: parse_or_default(
                "BOOKING_MAX_RETRY_ATTEMPTS",
                DEFAULT_MAX_RETRY_ATTEMPTS,
            ),
            booking_retry_backoff_ms: parse_or_default(
                "BOOKING_RETRY_BACKOFF_MS",
                DEFAULT_RETRY_BACKOFF_MS,
            ),
            storage_timeout_seconds: parse_or_default(
                "STORAGE_TIMEOUT_SECONDS",
                DEFAULT_STORAGE_TIMEOUT_SECONDS,
            ),
            default_consultation_fee: parse_or_default(
                "DEFAULT_CONSULTATION_FEE",
                DEFAULT_CONSULTATION_FEE,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
