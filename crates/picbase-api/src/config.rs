//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8501` |
//! | `DATABASE_URL` | `sqlite://picbase.db` |
//! | `ASSET_STORAGE_PATH` | `uploads` |
//! | `MAX_UPLOAD_MB` | `200` |
//! | `SESSION_TTL_HOURS` | `168` |
//! | `LOGIN_RATE_LIMIT_PER_MINUTE` | `20` (`0` disables) |
//! | `ALLOWED_ORIGINS` | `http://localhost:8501,http://localhost:3000` |
//!
//! AI variables are read by [`AiConfig`].

use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use picbase_core::defaults;
use picbase_core::{Error, Result};
use picbase_crypto::PasswordParams;
use picbase_inference::AiConfig;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:8501,http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub asset_storage_path: PathBuf,
    pub max_upload_bytes: u64,
    pub session_ttl: chrono::Duration,
    /// Login attempts allowed per minute across the server; `0` disables limiting.
    pub login_rate_limit_per_minute: u32,
    pub allowed_origins: Vec<String>,
    pub ai: AiConfig,
    pub password_params: PasswordParams,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            database_url: defaults::DATABASE_URL.to_string(),
            asset_storage_path: PathBuf::from(defaults::ASSET_STORAGE_PATH),
            max_upload_bytes: defaults::MAX_UPLOAD_MB * defaults::BYTES_PER_MB,
            session_ttl: chrono::Duration::hours(defaults::SESSION_TTL_HOURS),
            login_rate_limit_per_minute: defaults::LOGIN_RATE_LIMIT_PER_MINUTE,
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            ai: AiConfig::default(),
            password_params: PasswordParams::default(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let base = Self::default();

        let max_upload_mb: u64 = parse_or(get("MAX_UPLOAD_MB"), "MAX_UPLOAD_MB", defaults::MAX_UPLOAD_MB)?;
        if max_upload_mb == 0 {
            return Err(Error::Config("MAX_UPLOAD_MB must be at least 1".to_string()));
        }
        let max_upload_bytes = max_upload_mb
            .checked_mul(defaults::BYTES_PER_MB)
            .ok_or_else(|| Error::Config(format!("MAX_UPLOAD_MB {} is too large", max_upload_mb)))?;
        let ttl_hours: i64 = parse_or(
            get("SESSION_TTL_HOURS"),
            "SESSION_TTL_HOURS",
            defaults::SESSION_TTL_HOURS,
        )?;
        if !(1..=defaults::SESSION_TTL_HOURS_MAX).contains(&ttl_hours) {
            return Err(Error::Config(format!(
                "SESSION_TTL_HOURS must be between 1 and {}",
                defaults::SESSION_TTL_HOURS_MAX
            )));
        }

        Ok(Self {
            host: get("HOST").unwrap_or(base.host),
            port: parse_or(get("PORT"), "PORT", defaults::SERVER_PORT)?,
            database_url: get("DATABASE_URL").unwrap_or(base.database_url),
            asset_storage_path: get("ASSET_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(base.asset_storage_path),
            max_upload_bytes,
            session_ttl: chrono::Duration::hours(ttl_hours),
            login_rate_limit_per_minute: parse_or(
                get("LOGIN_RATE_LIMIT_PER_MINUTE"),
                "LOGIN_RATE_LIMIT_PER_MINUTE",
                defaults::LOGIN_RATE_LIMIT_PER_MINUTE,
            )?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or(base.allowed_origins),
            ai: AiConfig::from_lookup(&lookup)?,
            password_params: base.password_params,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed CORS origins as header values; invalid entries are skipped.
    pub fn cors_origins(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect()
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid {} '{}'", key, v))),
        None => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
