use std::env;
use std::time::Duration;
use tracing::warn;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_DESK_PORT: u16 = 3000;
const DEFAULT_DRAFT_IDLE_MINUTES: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the dashboard REST API, without a trailing slash.
    pub api_base_url: String,
    pub api_key: String,
    pub jwt_secret: String,
    pub request_timeout_secs: u64,
    pub desk_port: u16,
    /// Open drafts untouched for this long are discarded.
    pub draft_idle_minutes: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("SPA_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("SPA_API_BASE_URL not set, using empty value");
                    String::new()
                }),
            api_key: env::var("SPA_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("SPA_API_KEY not set, requests will carry no api key");
                    String::new()
                }),
            jwt_secret: env::var("SPA_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SPA_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            request_timeout_secs: parse_or_default(
                "SPA_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            desk_port: parse_or_default("SPA_DESK_PORT", DEFAULT_DESK_PORT),
            draft_idle_minutes: parse_or_default(
                "SPA_DRAFT_IDLE_MINUTES",
                DEFAULT_DRAFT_IDLE_MINUTES,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty() && !self.jwt_secret.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn draft_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.draft_idle_minutes * 60)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
