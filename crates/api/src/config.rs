//! Startup configuration from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `ASTRAL_BIND_ADDR` | `0.0.0.0:8080` |
//! | `JWT_SECRET` | insecure dev secret (logged as a warning) |
//! | `ASTRAL_UTC_OFFSET_HOURS` | `-4` |
//! | `ASTRAL_SECOND_SEMESTER_MONTH` | `7` |
//! | `ASTRAL_LOG_FORMAT` | `json` |

use std::net::SocketAddr;

use anyhow::{Context, Result};

use astral_infra::OperationSettings;
use astral_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_secret_is_default: bool,
    pub settings: OperationSettings,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_secret_is_default", &self.jwt_secret_is_default)
            .field("settings", &self.settings)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("ASTRAL_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("ASTRAL_BIND_ADDR must be a socket address")?;

        let (jwt_secret, jwt_secret_is_default) = match var("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let utc_offset_hours = match var("ASTRAL_UTC_OFFSET_HOURS") {
            Some(v) => v.parse::<i32>().context("ASTRAL_UTC_OFFSET_HOURS must be an integer")?,
            None => -4,
        };
        let second_semester_month = match var("ASTRAL_SECOND_SEMESTER_MONTH") {
            Some(v) => v.parse::<u32>().context("ASTRAL_SECOND_SEMESTER_MONTH must be a month number")?,
            None => 7,
        };
        let settings = OperationSettings::new(utc_offset_hours, second_semester_month)
            .context("invalid calendar settings")?;

        let log_format = match var("ASTRAL_LOG_FORMAT") {
            Some(v) => v.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            jwt_secret_is_default,
            settings,
            log_format,
        })
    }

    pub fn warn_if_insecure(&self) {
        if self.jwt_secret_is_default {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
        }
    }
}
