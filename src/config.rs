//! Application Configuration
//!
//! All configuration values are loaded from environment variables once at
//! startup and handed to components explicitly. No other module reads the
//! environment.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration loading/validation failures. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address for the HTTP server (from SERVER_ADDR env var)
    pub server_addr: String,

    /// Postgres connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// Allowed CORS origin, credentials enabled (from CORS_ORIGIN env var)
    pub cors_origin: String,

    /// Signing secret for access tokens (from ACCESS_TOKEN_SECRET env var)
    pub access_token_secret: String,

    /// Signing secret for refresh tokens (from REFRESH_TOKEN_SECRET env var)
    pub refresh_token_secret: String,

    /// Access token lifetime in seconds (from ACCESS_TOKEN_EXPIRY_SECS env var)
    pub access_token_expiry_secs: i64,

    /// Refresh token lifetime in seconds (from REFRESH_TOKEN_EXPIRY_SECS env var)
    pub refresh_token_expiry_secs: i64,

    /// Issuer claim stamped into and required of every token (from TOKEN_ISSUER env var)
    pub token_issuer: String,

    /// Upload endpoint of the media host (from MEDIA_UPLOAD_URL env var)
    pub media_upload_url: String,

    /// Media host API key (from MEDIA_API_KEY env var)
    pub media_api_key: String,

    /// Media host API secret (from MEDIA_API_SECRET env var)
    pub media_api_secret: String,

    /// Spool directory for incoming multipart files (from UPLOAD_TMP_DIR env var)
    pub upload_tmp_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_addr: env::var("SERVER_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),

            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?,

            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?,

            access_token_expiry_secs: env::var("ACCESS_TOKEN_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900), // 15 minutes default

            refresh_token_expiry_secs: env::var("REFRESH_TOKEN_EXPIRY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(864000), // 10 days default

            token_issuer: env::var("TOKEN_ISSUER")
                .unwrap_or_else(|_| "vidstream-api".to_string()),

            media_upload_url: env::var("MEDIA_UPLOAD_URL")
                .map_err(|_| ConfigError::Missing("MEDIA_UPLOAD_URL"))?,

            media_api_key: env::var("MEDIA_API_KEY")
                .map_err(|_| ConfigError::Missing("MEDIA_API_KEY"))?,

            media_api_secret: env::var("MEDIA_API_SECRET")
                .map_err(|_| ConfigError::Missing("MEDIA_API_SECRET"))?,

            upload_tmp_dir: env::var("UPLOAD_TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./tmp/uploads")),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "ACCESS_TOKEN_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.refresh_token_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "REFRESH_TOKEN_SECRET must be at least 32 characters".to_string(),
            ));
        }

        // Verification with the wrong-kind secret must fail at the signature
        // check, which only holds when the two secrets differ.
        if self.access_token_secret == self.refresh_token_secret {
            return Err(ConfigError::Invalid(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_string(),
            ));
        }

        if self.access_token_expiry_secs <= 0 {
            return Err(ConfigError::Invalid(
                "ACCESS_TOKEN_EXPIRY_SECS must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiry_secs <= self.access_token_expiry_secs {
            return Err(ConfigError::Invalid(
                "REFRESH_TOKEN_EXPIRY_SECS must be greater than ACCESS_TOKEN_EXPIRY_SECS"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
