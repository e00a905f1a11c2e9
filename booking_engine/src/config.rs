use std::env;

use chrono::Duration;
use hsb_common::Secret;
use log::*;

const DEFAULT_CANCELLATION_WINDOW_MINUTES: i64 = 120;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_NOTIFY_FROM: &str = "bookings@example.com";

/// Engine configuration, sourced from `HSB_*` environment variables with logged fallbacks. The engine
/// never reads the environment outside this type; everything downstream receives explicit values.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: String,
    pub payment: PaymentConfig,
    /// How long a requester may cancel an unclaimed booking after placing it.
    pub cancellation_window: Duration,
    /// Upper bound on any single call to the payment provider.
    pub provider_timeout: std::time::Duration,
    /// The From address used for partner notifications.
    pub notify_from: String,
}

#[derive(Clone, Debug, Default)]
pub struct PaymentConfig {
    /// The API key identifying this merchant with the payment provider.
    pub key_id: String,
    /// The shared secret used to verify payment-confirmation signatures.
    pub key_secret: Secret<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            payment: PaymentConfig::default(),
            cancellation_window: Duration::minutes(DEFAULT_CANCELLATION_WINDOW_MINUTES),
            provider_timeout: std::time::Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            notify_from: DEFAULT_NOTIFY_FROM.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("HSB_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ HSB_DATABASE_URL is not set. Please set it to the URL for the bookings database.");
            String::default()
        });
        let payment = PaymentConfig::from_env_or_default();
        let cancellation_window = env::var("HSB_CANCELLATION_WINDOW_MINUTES")
            .map_err(|_| {
                info!(
                    "🪛️ HSB_CANCELLATION_WINDOW_MINUTES is not set. Using the default value of \
                     {DEFAULT_CANCELLATION_WINDOW_MINUTES} minutes."
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map(Duration::minutes)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for HSB_CANCELLATION_WINDOW_MINUTES. {e}"))
            })
            .ok()
            .unwrap_or_else(|| Duration::minutes(DEFAULT_CANCELLATION_WINDOW_MINUTES));
        let provider_timeout = env::var("HSB_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for HSB_PROVIDER_TIMEOUT_SECS. {e}"))
                    .ok()
            })
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| std::time::Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS));
        let notify_from = env::var("HSB_NOTIFY_FROM").ok().unwrap_or_else(|| {
            info!("🪛️ HSB_NOTIFY_FROM is not set. Using the default sender address.");
            DEFAULT_NOTIFY_FROM.to_string()
        });
        Self { database_url, payment, cancellation_window, provider_timeout, notify_from }
    }
}

impl PaymentConfig {
    pub fn from_env_or_default() -> Self {
        let key_id = env::var("HSB_PAYMENT_KEY_ID").ok().unwrap_or_else(|| {
            error!("🪛️ HSB_PAYMENT_KEY_ID is not set. Please set it to your payment provider API key id.");
            String::default()
        });
        let key_secret = env::var("HSB_PAYMENT_KEY_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ HSB_PAYMENT_KEY_SECRET is not set. Payment confirmation signatures cannot be verified without \
                 it."
            );
            String::default()
        });
        Self { key_id, key_secret: Secret::new(key_secret) }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.cancellation_window, Duration::hours(2));
        assert_eq!(config.provider_timeout, std::time::Duration::from_secs(10));
    }
}
