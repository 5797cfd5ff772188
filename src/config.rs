use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tracing::info;

use crate::error::{AppError, Result};

pub const DEFAULT_GUEST_TTL_HOURS: i64 = 24;
pub const DEFAULT_MORTGAGE_DELAY_SECS: u64 = 10;

/// Connection details for the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs against the in-memory backend.
    pub backend: Option<BackendConfig>,
    pub guest_ttl: ChronoDuration,
    pub session_file: PathBuf,
    pub oauth_redirect: String,
    pub mortgage_offer_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: None,
            guest_ttl: ChronoDuration::hours(DEFAULT_GUEST_TTL_HOURS),
            session_file: PathBuf::from(".estate_session.json"),
            oauth_redirect: "http://localhost:5173/main".to_string(),
            mortgage_offer_delay: Duration::from_secs(DEFAULT_MORTGAGE_DELAY_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let backend = match (var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(BackendConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            (None, None) => {
                info!("SUPABASE_URL not set, using the in-memory backend");
                None
            }
            _ => {
                return Err(AppError::Config(
                    "SUPABASE_URL and SUPABASE_ANON_KEY must be set together".to_string(),
                ))
            }
        };

        let ttl_hours: i64 = try_load("ESTATE_GUEST_TTL_HOURS", DEFAULT_GUEST_TTL_HOURS)?;
        if ttl_hours <= 0 {
            return Err(AppError::Config(
                "ESTATE_GUEST_TTL_HOURS must be positive".to_string(),
            ));
        }
        let delay_secs: u64 = try_load("ESTATE_MORTGAGE_DELAY_SECS", DEFAULT_MORTGAGE_DELAY_SECS)?;

        Ok(Self {
            backend,
            guest_ttl: ChronoDuration::hours(ttl_hours),
            session_file: var("ESTATE_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            oauth_redirect: var("ESTATE_OAUTH_REDIRECT").unwrap_or(defaults.oauth_redirect),
            mortgage_offer_delay: Duration::from_secs(delay_secs),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("invalid {key} value {raw:?}: {e}"))),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
