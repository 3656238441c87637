use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Which record server implementation backs the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceBackend {
    Http,
    Memory,
}

impl FromStr for PersistenceBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(PersistenceBackend::Http),
            "memory" => Ok(PersistenceBackend::Memory),
            other => bail!("PERSISTENCE_BACKEND must be 'http' or 'memory', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub persistence_backend: PersistenceBackend,
    pub persistence_url: Option<String>,
    pub persistence_api_token: Option<String>,
    pub persistence_timeout_secs: u64,
    pub preview_row_limit: usize,
    pub max_upload_bytes: usize,
    pub import_session_ttl_minutes: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let persistence_backend: PersistenceBackend =
            optional_env("PERSISTENCE_BACKEND", "http").parse()?;
        let persistence_url = match persistence_backend {
            PersistenceBackend::Http => Some(require_env("PERSISTENCE_URL")?),
            PersistenceBackend::Memory => std::env::var("PERSISTENCE_URL").ok(),
        };

        Ok(Config {
            persistence_backend,
            persistence_url,
            persistence_api_token: std::env::var("PERSISTENCE_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            persistence_timeout_secs: parse_env("PERSISTENCE_TIMEOUT_SECS", "60")?,
            preview_row_limit: parse_env("PREVIEW_ROW_LIMIT", "5")?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", "10485760")?,
            import_session_ttl_minutes: parse_env("IMPORT_SESSION_TTL_MINUTES", "30")?,
            port: parse_env("PORT", "8080")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    optional_env(key, default)
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>()))
}
