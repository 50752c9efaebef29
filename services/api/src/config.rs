//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// HMAC secret for signing bearer tokens.
    pub jwt_secret: String,
    /// Where admin-facing notifications (new applications, new requests,
    /// completed sessions) are delivered.
    pub admin_email: String,
    /// HTTP mail relay endpoint. When unset, mail is logged instead of sent.
    pub mail_endpoint: Option<String>,
    pub mail_from: String,
    /// Base URL that generated meeting links are constructed under.
    pub meeting_base_url: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure tests
    /// are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        let admin_email = std::env::var("ADMIN_EMAIL")
            .map_err(|_| ConfigError::MissingVar("ADMIN_EMAIL".to_string()))?;

        let mail_endpoint = std::env::var("MAIL_ENDPOINT").ok();
        let mail_from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "no-reply@tutoring.local".to_string());

        let meeting_base_url = std::env::var("MEETING_BASE_URL")
            .unwrap_or_else(|_| "https://meet.tutoring.local".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            admin_email,
            mail_endpoint,
            mail_from,
            meeting_base_url,
        })
    }
}
