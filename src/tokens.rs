//! JWT Token Service
//!
//! HMAC-SHA256 signing for access and refresh tokens. The two kinds use
//! separate secrets, so a token presented as the wrong kind fails the
//! signature check. Pure cryptographic component with no persistence.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{AccessTokenClaims, RefreshTokenClaims, User};

/// Token generation and verification errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token")]
    Invalid,

    #[error("Failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies both token kinds
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_expiry_secs: i64,
    refresh_expiry_secs: i64,
    issuer: String,
}

impl TokenService {
    /// Create a new token service from the application configuration
    pub fn new(config: &AppConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_expiry_secs: config.access_token_expiry_secs,
            refresh_expiry_secs: config.refresh_token_expiry_secs,
            issuer: config.token_issuer.clone(),
        }
    }

    pub fn access_expiry_secs(&self) -> i64 {
        self.access_expiry_secs
    }

    pub fn refresh_expiry_secs(&self) -> i64 {
        self.refresh_expiry_secs
    }

    /// Generate an access token carrying the account's display claims
    pub fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_expiry_secs);

        let claims = AccessTokenClaims {
            sub: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.access_encoding)?;
        Ok(token)
    }

    /// Generate a refresh token carrying only the account id
    ///
    /// The `jti` keeps consecutive tokens distinct even when issued within
    /// one clock second; stored-token comparison relies on that.
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.refresh_expiry_secs);

        let claims = RefreshTokenClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.refresh_encoding)?;
        Ok(token)
    }

    /// Validate an access token and extract its claims
    pub fn verify_access(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let token_data = decode::<AccessTokenClaims>(token, &self.access_decoding, &self.validation())
            .map_err(map_decode_error)?;

        Ok(token_data.claims)
    }

    /// Validate a refresh token and extract its claims
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshTokenClaims, TokenError> {
        let token_data =
            decode::<RefreshTokenClaims>(token, &self.refresh_decoding, &self.validation())
                .map_err(map_decode_error)?;

        Ok(token_data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Invalid,
    }
}
