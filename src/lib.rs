//! VidStream Account API
//!
//! User account backend for a video hosting service providing:
//! - Multipart registration with avatar and cover image upload
//! - Login by username or email
//! - JWT access and refresh tokens with single-slot refresh rotation
//! - Argon2id password hashing
//! - httpOnly cookie sessions beside bearer authentication
//! - Profile, avatar, and cover image updates
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `DATABASE_URL` - PostgreSQL connection string (required)
//! - `ACCESS_TOKEN_SECRET` - access token signing secret (required, min 32 chars)
//! - `REFRESH_TOKEN_SECRET` - refresh token signing secret (required, min 32
//!   chars, must differ from the access secret)
//! - `MEDIA_UPLOAD_URL` - media host upload endpoint (required)
//! - `MEDIA_API_KEY` / `MEDIA_API_SECRET` - media host credentials (required)
//! - `SERVER_ADDR` - listen address (default: "0.0.0.0:8000")
//! - `CORS_ORIGIN` - allowed CORS origin (default: "http://localhost:3000")
//! - `ACCESS_TOKEN_EXPIRY_SECS` - access token lifetime (default: 900)
//! - `REFRESH_TOKEN_EXPIRY_SECS` - refresh token lifetime (default: 864000)
//! - `TOKEN_ISSUER` - issuer claim (default: "vidstream-api")
//! - `UPLOAD_TMP_DIR` - multipart spool directory (default: "./tmp/uploads")
//!
//! # Usage
//!
//! ```rust,ignore
//! use vidstream_api::{config::AppConfig, init};
//!
//! let config = AppConfig::from_env()?;
//! config.validate()?;
//!
//! let db = sqlx::PgPool::connect(&config.database_url).await?;
//! let router = init(&config, db).await?;
//! ```

pub mod config;
pub mod cookies;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod models;
pub mod service;
pub mod store;
pub mod tokens;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{ApiError, ApiResponse};
pub use extractors::{ApiJson, CurrentUser};
pub use handlers::AppState;
pub use models::*;
pub use service::SessionService;
pub use store::{PgUserStore, UserStore};
pub use tokens::TokenService;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use crate::media::RemoteMediaHost;

/// Wire the application router from configuration and a database pool
///
/// Runs migrations, then assembles the store, media host, token service,
/// and session service behind the router.
pub async fn init(config: &AppConfig, db: PgPool) -> Result<Router, ApiError> {
    let store = PgUserStore::new(db);
    store.run_migrations().await?;

    let state = AppState {
        service: Arc::new(SessionService::new(
            Arc::new(store),
            Arc::new(RemoteMediaHost::new(config)),
            TokenService::new(config),
        )),
        spool_dir: config.upload_tmp_dir.clone(),
    };

    Ok(handlers::create_router(state, &config.cors_origin))
}
