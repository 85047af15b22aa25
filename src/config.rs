use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};

/// Process-lifetime configuration, read once at startup and injected through
/// `AppState` instead of ambient env lookups at call sites.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// Base URL of the external scoring service, e.g. `http://algo:8080`.
    pub algorithm_base_url: String,
    pub algorithm_timeout_secs: u64,
    /// HMAC key for bearer-token verification, base64 in the environment.
    pub session_key: Vec<u8>,
    /// Raw sleep sessions older than this many days are purged nightly.
    pub sleep_retention_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL missing")?;

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
            format!("0.0.0.0:{port}")
        });

        let algorithm_base_url = std::env::var("RECOMMEND_ALGORITHM_URL")
            .context("RECOMMEND_ALGORITHM_URL missing")?
            .trim_end_matches('/')
            .to_string();

        let algorithm_timeout_secs = std::env::var("RECOMMEND_ALGORITHM_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(10);

        let session_key_b64 = std::env::var("SESSION_KEY").context("SESSION_KEY missing")?;
        let session_key = general_purpose::STANDARD
            .decode(session_key_b64)
            .context("SESSION_KEY must be base64")?;

        let sleep_retention_days = std::env::var("SLEEP_RETENTION_DAYS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(90);

        Ok(Self {
            database_url,
            bind_addr,
            algorithm_base_url,
            algorithm_timeout_secs,
            session_key,
            sleep_retention_days,
        })
    }
}
